//! Response envelope shared by every JSON handler.

use serde::Serialize;

/// Wrapper producing the `{ "data": ... }` body shape used on all
/// successful responses, so clients can destructure uniformly.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
