use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr,
};

use proj_sys as proj;

#[derive(Debug)]
pub struct ProjError {
    pub code: i32,
    pub message: String,
    pub context: &'static str,
}

impl std::fmt::Display for ProjError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PROJ error ({}): {} {}",
            self.context, self.code, self.message
        )
    }
}

impl std::error::Error for ProjError {}

/// A reusable CRS-to-CRS transform.
///
/// Owns a PROJ context and transform handle; both are released exactly once
/// on drop, whichever way the owner goes away. A context must be used by
/// only one thread at a time.
#[derive(Debug)]
pub struct Reprojector {
    ctx: *mut proj::PJ_CONTEXT,
    pj: *mut proj::PJ,
}

impl Reprojector {
    /// Build a transform between two CRS definitions (anything PROJ parses,
    /// e.g. `"EPSG:4979"` or a WKT string).
    pub fn new(source: &str, target: &str) -> Result<Self, ProjError> {
        let ctx = unsafe { proj::proj_context_create() };
        if ctx.is_null() {
            return Err(ProjError {
                code: 0,
                message: "proj_context_create() returned NULL".to_string(),
                context: "proj_context_create",
            });
        }

        let source = match CString::new(source) {
            Ok(s) => s,
            Err(_) => {
                unsafe { proj::proj_context_destroy(ctx) };
                return Err(ProjError {
                    code: 0,
                    message: "source CRS contains NUL byte".to_string(),
                    context: "proj_create_crs_to_crs",
                });
            }
        };
        let target = match CString::new(target) {
            Ok(s) => s,
            Err(_) => {
                unsafe { proj::proj_context_destroy(ctx) };
                return Err(ProjError {
                    code: 0,
                    message: "target CRS contains NUL byte".to_string(),
                    context: "proj_create_crs_to_crs",
                });
            }
        };

        let pj = unsafe {
            proj::proj_create_crs_to_crs(ctx, source.as_ptr(), target.as_ptr(), ptr::null_mut())
        };
        if pj.is_null() {
            let err = proj_error_from_ctx(ctx, "proj_create_crs_to_crs");
            unsafe {
                proj::proj_context_destroy(ctx);
            }
            return Err(err);
        }

        Ok(Self { ctx, pj })
    }

    /// Reproject one coordinate triple in place.
    ///
    /// On failure the coordinates are whatever PROJ left behind (HUGE_VAL
    /// for untransformable input), so callers should not use them.
    pub fn transform_in_place(
        &mut self,
        x: &mut f64,
        y: &mut f64,
        z: &mut f64,
    ) -> Result<(), ProjError> {
        let stride = std::mem::size_of::<f64>();
        unsafe {
            proj::proj_errno_reset(self.pj);

            proj::proj_trans_generic(
                self.pj,
                proj::PJ_DIRECTION_PJ_FWD,
                x,
                stride,
                1,
                y,
                stride,
                1,
                z,
                stride,
                1,
                ptr::null_mut(),
                0,
                0,
            );

            let err = proj::proj_errno(self.pj);
            if err != 0 {
                return Err(proj_error_from_pj(self.ctx, self.pj, "proj_trans_generic"));
            }
        }

        Ok(())
    }
}

impl Drop for Reprojector {
    fn drop(&mut self) {
        unsafe {
            if !self.pj.is_null() {
                proj::proj_destroy(self.pj);
                self.pj = ptr::null_mut();
            }
            if !self.ctx.is_null() {
                proj::proj_context_destroy(self.ctx);
                self.ctx = ptr::null_mut();
            }
        }
    }
}

fn proj_error_from_pj(
    ctx: *mut proj::PJ_CONTEXT,
    pj: *mut proj::PJ,
    context: &'static str,
) -> ProjError {
    let code = unsafe { proj::proj_errno(pj) };
    let message = proj_error_message(ctx, code);
    ProjError {
        code,
        message,
        context,
    }
}

fn proj_error_from_ctx(ctx: *mut proj::PJ_CONTEXT, context: &'static str) -> ProjError {
    let code = unsafe { proj::proj_context_errno(ctx) };
    let message = proj_error_message(ctx, code);
    ProjError {
        code,
        message,
        context,
    }
}

fn proj_error_message(ctx: *mut proj::PJ_CONTEXT, code: i32) -> String {
    let c_msg = unsafe { proj::proj_context_errno_string(ctx, code) };
    if c_msg.is_null() {
        return "unknown error".to_string();
    }
    unsafe { CStr::from_ptr(c_msg as *const c_char) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_crs_fails_at_construction() {
        let result = Reprojector::new("not a crs", "EPSG:4326");
        assert!(result.is_err());
    }

    #[test]
    fn identical_crs_transform_is_a_noop() {
        let mut reprojector = Reprojector::new("EPSG:4326", "EPSG:4326").unwrap();
        let (mut x, mut y, mut z) = (7.44, 46.95, 550.0);
        reprojector.transform_in_place(&mut x, &mut y, &mut z).unwrap();
        assert!((x - 7.44).abs() < 1e-9);
        assert!((y - 46.95).abs() < 1e-9);
        assert!((z - 550.0).abs() < 1e-9);
    }
}
