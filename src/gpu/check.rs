use super::api::GraphicsApi;
use crate::utils::error::{GlooError, Result};

/// Drains pending driver errors and fails if there were any.
///
/// Collection stops at `NO_ERROR` or when the driver repeats the previous code,
/// since some drivers report a sticky error forever. `checkpoint` names the
/// place the check ran, e.g. `"before draw"`.
pub fn check_error<A: GraphicsApi + ?Sized>(api: &A, checkpoint: &str) -> Result<()> {
    let mut codes: Vec<u32> = Vec::new();
    loop {
        let code = api.get_error();
        if code == gl::NO_ERROR || codes.last() == Some(&code) {
            break;
        }
        codes.push(code);
    }
    if codes.is_empty() {
        Ok(())
    } else {
        Err(GlooError::GraphicsApi {
            checkpoint: checkpoint.to_string(),
            codes,
        })
    }
}
