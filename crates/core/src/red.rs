//! RED document construction.
//!
//! A RED document describes one notebook execution end to end: the CLI
//! tool description (papermill), the fetchable inputs, the result upload
//! target, the container image, and the execution backend access block.
//! Building is pure and deterministic; the submission workflow serializes
//! the result and posts it to the agency.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::url::join_url;

/// RED format version understood by CC-Agency.
pub const RED_VERSION: &str = "9";

/// Fixed output filename papermill writes inside the container.
pub const OUTPUT_NOTEBOOK_FILENAME: &str = "output.ipynb";

const CWL_VERSION: &str = "v1.0";
const CLI_CLASS: &str = "CommandLineTool";
const BASE_COMMAND: &str = "papermill";
const CLI_DOC: &str = "Executes a jupyter notebook";
const INPUT_NOTEBOOK_BASENAME: &str = "inputNotebook.ipynb";
const REQUIREMENTS_BASENAME: &str = "requirements.txt";
const CONNECTOR_HTTP_JSON: &str = "red-connector-http-json";
const CONNECTOR_HTTP: &str = "red-connector-http";
const CONNECTOR_SSH: &str = "red-connector-ssh";
const CONTAINER_ENGINE: &str = "docker";
const CONTAINER_RAM_MB: i64 = 4096;
const GPU_VENDOR: &str = "nvidia";
const EXECUTION_ENGINE: &str = "ccagency";

/// Input names claimed by the static CLI skeleton. External data bindings
/// must not shadow these.
const RESERVED_INPUT_NAMES: [&str; 3] = [
    "inputNotebook",
    "outputNotebookFilename",
    "pythonRequirements",
];

// ---------------------------------------------------------------------------
// Submission-side parameter types
// ---------------------------------------------------------------------------

/// A single GPU requirement from a submission request.
#[derive(Debug, Clone, Deserialize)]
pub struct GpuRequirement {
    /// Minimum GPU memory in megabytes.
    pub vram_min: i64,
}

/// One external data source to make available inside the container.
///
/// Only SSH connectors are supported. `File` bindings require `file_path`,
/// `Directory` bindings require `dir_path`; a mounted directory is
/// additionally marked writable.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalDataBinding {
    /// Name the notebook refers to the input by.
    pub input_name: String,
    /// `"File"` or `"Directory"`.
    pub input_type: String,
    /// Connector kind; only `"SSH"` is accepted.
    pub connector_type: String,
    pub host: String,
    pub username: String,
    pub password: String,
    pub file_path: Option<String>,
    pub dir_path: Option<String>,
    /// Mount the directory instead of copying it into the container.
    #[serde(default)]
    pub mount: bool,
}

/// Everything the builder needs to render one RED document.
#[derive(Debug)]
pub struct RedParams<'a> {
    pub notebook_id: Uuid,
    /// Per-job plaintext secret; embedded as connector auth, never persisted.
    pub notebook_token: &'a str,
    /// Normalized agency base URL (trailing slash).
    pub agency_url: &'a str,
    pub agency_username: &'a str,
    /// Normalized public base URL of this service (trailing slash).
    pub url_root: &'a str,
    /// Resolved docker image reference.
    pub container_image: &'a str,
    pub gpus: &'a [GpuRequirement],
    pub external_data: &'a [ExternalDataBinding],
    pub has_python_requirements: bool,
}

// ---------------------------------------------------------------------------
// Document model (serialization is the wire contract)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedDocument {
    pub red_version: &'static str,
    pub cli: Cli,
    pub inputs: RedInputs,
    pub outputs: RedOutputs,
    pub container: Container,
    pub execution: Execution,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cli {
    pub cwl_version: &'static str,
    pub class: &'static str,
    pub base_command: Vec<&'static str>,
    pub doc: &'static str,
    pub inputs: CliInputs,
    pub outputs: CliOutputs,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliInputs {
    pub input_notebook: CliInput,
    pub output_notebook_filename: CliInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_requirements: Option<CliInput>,
    /// External data inputs keyed by their user-chosen name.
    #[serde(flatten)]
    pub external: BTreeMap<String, CliInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliInput {
    #[serde(rename = "type")]
    pub cwl_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_binding: Option<CliInputBinding>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CliInputBinding {
    pub position: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOutputs {
    pub output_notebook: CliOutput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOutput {
    #[serde(rename = "type")]
    pub cwl_type: String,
    pub output_binding: CliOutputBinding,
}

#[derive(Debug, Clone, Serialize)]
pub struct CliOutputBinding {
    pub glob: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedInputs {
    pub input_notebook: FetchableFile,
    /// Plain string value, not a connector object.
    pub output_notebook_filename: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_requirements: Option<FetchableFile>,
    #[serde(flatten)]
    pub external: BTreeMap<String, ExternalInput>,
}

/// A file the execution backend pulls from this service over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct FetchableFile {
    pub class: &'static str,
    pub connector: HttpConnector,
    pub basename: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpConnector {
    pub command: &'static str,
    pub access: HttpAccess,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAccess {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
    pub auth: Auth,
}

#[derive(Debug, Clone, Serialize)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

/// An external data input reachable over SSH.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalInput {
    pub class: String,
    pub connector: SshConnector,
}

#[derive(Debug, Clone, Serialize)]
pub struct SshConnector {
    pub command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<bool>,
    pub access: SshAccess,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshAccess {
    pub host: String,
    pub auth: Auth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedOutputs {
    pub output_notebook: UploadableFile,
}

/// The executed notebook, pushed back to this service over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct UploadableFile {
    pub class: &'static str,
    pub connector: HttpConnector,
}

#[derive(Debug, Clone, Serialize)]
pub struct Container {
    pub engine: &'static str,
    pub settings: ContainerSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSettings {
    pub image: ImageRef,
    /// Container memory limit in megabytes.
    pub ram: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<GpuSettings>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuSettings {
    pub vendor: &'static str,
    pub devices: Vec<GpuDevice>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuDevice {
    pub vram_min: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub engine: &'static str,
    pub settings: ExecutionSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSettings {
    pub access: HttpAccess,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Render a RED document for one notebook execution.
///
/// Pure and deterministic: validation failures surface before anything is
/// constructed, external bindings render in name-sorted order, and the
/// same parameters always produce the same document. The connector auth
/// blocks carry the per-job notebook token; the user's real agency
/// password never enters the document (the execution access block sends
/// an empty password because authorization travels via cookie).
pub fn build_red_document(params: &RedParams) -> Result<RedDocument, CoreError> {
    validate_external_data(params.external_data)?;

    let id = params.notebook_id;
    let callback_auth = Auth {
        username: params.agency_username.to_string(),
        password: params.notebook_token.to_string(),
    };

    let mut cli_external = BTreeMap::new();
    let mut external = BTreeMap::new();
    for binding in params.external_data {
        cli_external.insert(
            binding.input_name.clone(),
            CliInput {
                cwl_type: binding.input_type.clone(),
                input_binding: None,
            },
        );
        external.insert(binding.input_name.clone(), render_external_input(binding));
    }

    let cli = Cli {
        cwl_version: CWL_VERSION,
        class: CLI_CLASS,
        base_command: vec![BASE_COMMAND],
        doc: CLI_DOC,
        inputs: CliInputs {
            input_notebook: CliInput {
                cwl_type: "File".into(),
                input_binding: Some(CliInputBinding { position: 1 }),
            },
            output_notebook_filename: CliInput {
                cwl_type: "string".into(),
                input_binding: Some(CliInputBinding { position: 2 }),
            },
            python_requirements: params.has_python_requirements.then(|| CliInput {
                cwl_type: "File".into(),
                input_binding: None,
            }),
            external: cli_external,
        },
        outputs: CliOutputs {
            output_notebook: CliOutput {
                cwl_type: "File".into(),
                output_binding: CliOutputBinding {
                    glob: "$(inputs.outputNotebookFilename)".into(),
                },
            },
        },
    };

    let inputs = RedInputs {
        input_notebook: FetchableFile {
            class: "File",
            connector: HttpConnector {
                command: CONNECTOR_HTTP_JSON,
                access: HttpAccess {
                    url: join_url(params.url_root, &format!("notebook/{id}")),
                    method: Some("GET"),
                    auth: callback_auth.clone(),
                },
            },
            basename: INPUT_NOTEBOOK_BASENAME,
        },
        output_notebook_filename: OUTPUT_NOTEBOOK_FILENAME,
        python_requirements: params.has_python_requirements.then(|| FetchableFile {
            class: "File",
            connector: HttpConnector {
                command: CONNECTOR_HTTP,
                access: HttpAccess {
                    url: join_url(params.url_root, &format!("python_requirements/{id}")),
                    method: Some("GET"),
                    auth: callback_auth.clone(),
                },
            },
            basename: REQUIREMENTS_BASENAME,
        }),
        external,
    };

    let outputs = RedOutputs {
        output_notebook: UploadableFile {
            class: "File",
            connector: HttpConnector {
                command: CONNECTOR_HTTP,
                access: HttpAccess {
                    url: join_url(params.url_root, &format!("result/{id}")),
                    method: None,
                    auth: callback_auth,
                },
            },
        },
    };

    let container = Container {
        engine: CONTAINER_ENGINE,
        settings: ContainerSettings {
            image: ImageRef {
                url: params.container_image.to_string(),
            },
            ram: CONTAINER_RAM_MB,
            gpus: render_gpus(params.gpus),
        },
    };

    let execution = Execution {
        engine: EXECUTION_ENGINE,
        settings: ExecutionSettings {
            access: HttpAccess {
                url: params.agency_url.to_string(),
                method: None,
                auth: Auth {
                    username: params.agency_username.to_string(),
                    password: String::new(),
                },
            },
        },
    };

    Ok(RedDocument {
        red_version: RED_VERSION,
        cli,
        inputs,
        outputs,
        container,
        execution,
    })
}

/// Reject malformed external data before any document state is built.
///
/// Upstream request validation should already have caught these; this is
/// the last line of defense before the document is rendered.
fn validate_external_data(bindings: &[ExternalDataBinding]) -> Result<(), CoreError> {
    let mut seen = BTreeSet::new();

    for binding in bindings {
        let name = binding.input_name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "External data input name must not be empty".into(),
            ));
        }
        if RESERVED_INPUT_NAMES.contains(&name) {
            return Err(CoreError::Validation(format!(
                "External data input name is reserved: {name}"
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(CoreError::Validation(format!(
                "Duplicate external data input name: {name}"
            )));
        }

        if !binding.connector_type.eq_ignore_ascii_case("ssh") {
            return Err(CoreError::Configuration(format!(
                "Unsupported connector type: {}",
                binding.connector_type
            )));
        }

        match binding.input_type.as_str() {
            "File" => {
                if binding.file_path.as_deref().unwrap_or("").is_empty() {
                    return Err(CoreError::Validation(format!(
                        "File binding {name} requires file_path"
                    )));
                }
                if binding.mount {
                    return Err(CoreError::Validation(format!(
                        "File binding {name} cannot be mounted"
                    )));
                }
            }
            "Directory" => {
                if binding.dir_path.as_deref().unwrap_or("").is_empty() {
                    return Err(CoreError::Validation(format!(
                        "Directory binding {name} requires dir_path"
                    )));
                }
            }
            other => {
                return Err(CoreError::Validation(format!(
                    "Unsupported input type: {other}"
                )));
            }
        }
    }

    Ok(())
}

fn render_external_input(binding: &ExternalDataBinding) -> ExternalInput {
    let is_directory = binding.input_type == "Directory";

    ExternalInput {
        class: binding.input_type.clone(),
        connector: SshConnector {
            command: CONNECTOR_SSH,
            mount: binding.mount.then_some(true),
            access: SshAccess {
                host: binding.host.clone(),
                auth: Auth {
                    username: binding.username.clone(),
                    password: binding.password.clone(),
                },
                file_path: if is_directory {
                    None
                } else {
                    binding.file_path.clone()
                },
                dir_path: if is_directory {
                    binding.dir_path.clone()
                } else {
                    None
                },
                writable: binding.mount.then_some(true),
            },
        },
    }
}

fn render_gpus(gpus: &[GpuRequirement]) -> Option<GpuSettings> {
    if gpus.is_empty() {
        return None;
    }
    Some(GpuSettings {
        vendor: GPU_VENDOR,
        devices: gpus
            .iter()
            .map(|gpu| GpuDevice {
                vram_min: gpu.vram_min,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params(id: Uuid) -> RedParams<'static> {
        RedParams {
            notebook_id: id,
            notebook_token: "3f6e3a52-token",
            agency_url: "https://agency.example.org/cc/",
            agency_username: "alice",
            url_root: "https://relay.example.org/",
            container_image: "bruno1996/cc_jupyterservice_base_image",
            gpus: &[],
            external_data: &[],
            has_python_requirements: false,
        }
    }

    fn build_json(params: &RedParams) -> serde_json::Value {
        let doc = build_red_document(params).expect("document should build");
        serde_json::to_value(&doc).expect("document should serialize")
    }

    #[test]
    fn test_static_skeleton() {
        let id = Uuid::new_v4();
        let json = build_json(&base_params(id));

        assert_eq!(json["redVersion"], "9");
        assert_eq!(json["cli"]["cwlVersion"], "v1.0");
        assert_eq!(json["cli"]["class"], "CommandLineTool");
        assert_eq!(json["cli"]["baseCommand"], serde_json::json!(["papermill"]));
        assert_eq!(json["cli"]["inputs"]["inputNotebook"]["inputBinding"]["position"], 1);
        assert_eq!(
            json["cli"]["outputs"]["outputNotebook"]["outputBinding"]["glob"],
            "$(inputs.outputNotebookFilename)"
        );
        // The output filename is a plain string value, not a connector.
        assert_eq!(json["inputs"]["outputNotebookFilename"], "output.ipynb");
        assert_eq!(json["container"]["engine"], "docker");
        assert_eq!(json["container"]["settings"]["ram"], 4096);
        assert_eq!(json["execution"]["engine"], "ccagency");
    }

    #[test]
    fn test_callback_urls_have_single_separating_slash() {
        let id = Uuid::new_v4();
        let json = build_json(&base_params(id));

        let notebook_url = json["inputs"]["inputNotebook"]["connector"]["access"]["url"]
            .as_str()
            .unwrap();
        let result_url = json["outputs"]["outputNotebook"]["connector"]["access"]["url"]
            .as_str()
            .unwrap();

        assert_eq!(notebook_url, format!("https://relay.example.org/notebook/{id}"));
        assert_eq!(result_url, format!("https://relay.example.org/result/{id}"));
        assert!(!notebook_url.contains("//notebook"));
    }

    #[test]
    fn test_connector_auth_uses_token_not_agency_password() {
        let id = Uuid::new_v4();
        let json = build_json(&base_params(id));

        let input_auth = &json["inputs"]["inputNotebook"]["connector"]["access"]["auth"];
        assert_eq!(input_auth["username"], "alice");
        assert_eq!(input_auth["password"], "3f6e3a52-token");

        // The execution access block authenticates via cookie; the password
        // field is present but empty.
        let exec_auth = &json["execution"]["settings"]["access"]["auth"];
        assert_eq!(exec_auth["username"], "alice");
        assert_eq!(exec_auth["password"], "");
        assert_eq!(
            json["execution"]["settings"]["access"]["url"],
            "https://agency.example.org/cc/"
        );
    }

    #[test]
    fn test_gpus_omitted_when_empty() {
        let id = Uuid::new_v4();
        let json = build_json(&base_params(id));
        assert!(json["container"]["settings"].get("gpus").is_none());
    }

    #[test]
    fn test_gpus_render_vendor_and_devices() {
        let id = Uuid::new_v4();
        let gpus = vec![GpuRequirement { vram_min: 2048 }, GpuRequirement { vram_min: 8192 }];
        let mut params = base_params(id);
        params.gpus = &gpus;

        let json = build_json(&params);
        let settings = &json["container"]["settings"]["gpus"];
        assert_eq!(settings["vendor"], "nvidia");
        assert_eq!(settings["devices"][0]["vramMin"], 2048);
        assert_eq!(settings["devices"][1]["vramMin"], 8192);
    }

    #[test]
    fn test_python_requirements_key_absent_when_not_supplied() {
        let id = Uuid::new_v4();
        let json = build_json(&base_params(id));

        assert!(json["cli"]["inputs"].get("pythonRequirements").is_none());
        assert!(json["inputs"].get("pythonRequirements").is_none());
    }

    #[test]
    fn test_python_requirements_rendered_when_supplied() {
        let id = Uuid::new_v4();
        let mut params = base_params(id);
        params.has_python_requirements = true;

        let json = build_json(&params);
        assert_eq!(json["cli"]["inputs"]["pythonRequirements"]["type"], "File");

        let section = &json["inputs"]["pythonRequirements"];
        assert_eq!(section["class"], "File");
        assert_eq!(section["basename"], "requirements.txt");
        assert_eq!(
            section["connector"]["access"]["url"],
            format!("https://relay.example.org/python_requirements/{id}")
        );
    }

    fn file_binding(name: &str) -> ExternalDataBinding {
        ExternalDataBinding {
            input_name: name.into(),
            input_type: "File".into(),
            connector_type: "SSH".into(),
            host: "data.example.org".into(),
            username: "datauser".into(),
            password: "datapass".into(),
            file_path: Some("/srv/data/input.csv".into()),
            dir_path: None,
            mount: false,
        }
    }

    #[test]
    fn test_external_file_binding_renders_in_both_sections() {
        let id = Uuid::new_v4();
        let bindings = vec![file_binding("measurements")];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let json = build_json(&params);
        assert_eq!(json["cli"]["inputs"]["measurements"]["type"], "File");

        let input = &json["inputs"]["measurements"];
        assert_eq!(input["class"], "File");
        assert_eq!(input["connector"]["command"], "red-connector-ssh");
        assert_eq!(input["connector"]["access"]["host"], "data.example.org");
        assert_eq!(input["connector"]["access"]["filePath"], "/srv/data/input.csv");
        assert!(input["connector"]["access"].get("dirPath").is_none());
        assert!(input["connector"].get("mount").is_none());
    }

    #[test]
    fn test_mounted_directory_is_writable() {
        let id = Uuid::new_v4();
        let bindings = vec![ExternalDataBinding {
            input_name: "workdir".into(),
            input_type: "Directory".into(),
            connector_type: "ssh".into(),
            host: "data.example.org".into(),
            username: "datauser".into(),
            password: "datapass".into(),
            file_path: None,
            dir_path: Some("/srv/data/work".into()),
            mount: true,
        }];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let json = build_json(&params);
        let connector = &json["inputs"]["workdir"]["connector"];
        assert_eq!(connector["mount"], true);
        assert_eq!(connector["access"]["dirPath"], "/srv/data/work");
        assert_eq!(connector["access"]["writable"], true);
    }

    #[test]
    fn test_duplicate_input_names_rejected() {
        let id = Uuid::new_v4();
        let bindings = vec![file_binding("data"), file_binding("data")];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let err = build_red_document(&params).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_reserved_input_name_rejected() {
        let id = Uuid::new_v4();
        let bindings = vec![file_binding("inputNotebook")];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let err = build_red_document(&params).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_unsupported_connector_type_is_configuration_error() {
        let id = Uuid::new_v4();
        let mut binding = file_binding("data");
        binding.connector_type = "FTP".into();
        let bindings = vec![binding];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let err = build_red_document(&params).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_file_binding_without_path_rejected() {
        let id = Uuid::new_v4();
        let mut binding = file_binding("data");
        binding.file_path = None;
        let bindings = vec![binding];
        let mut params = base_params(id);
        params.external_data = &bindings;

        let err = build_red_document(&params).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_builder_is_deterministic() {
        let id = Uuid::new_v4();
        let gpus = vec![GpuRequirement { vram_min: 4096 }];
        let bindings = vec![file_binding("zeta"), {
            let mut b = file_binding("alpha");
            b.file_path = Some("/srv/data/other.csv".into());
            b
        }];
        let mut params = base_params(id);
        params.gpus = &gpus;
        params.external_data = &bindings;
        params.has_python_requirements = true;

        let first = build_json(&params);
        let second = build_json(&params);
        assert_eq!(first, second);
    }
}
