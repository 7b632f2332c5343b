//! Symbols the plugin loader looks up in the module
#![allow(non_upper_case_globals)]

use std::{
    ffi::{c_char, c_void, CStr},
    panic,
    path::PathBuf,
};

use super::PluginError;

/// Status returned to the loader on success
pub const PLUGIN_OK: i32 = 0;
/// Status returned to the loader when loading failed
pub const PLUGIN_ERROR: i32 = -1;

/// Pointer to a static C string
#[repr(transparent)]
pub struct PluginString(*const c_char);

// SAFETY: only ever points to immutable static strings
unsafe impl Sync for PluginString {}

impl PluginString {
    pub fn to_str(&self) -> &'static str {
        // SAFETY: every PluginString is built from a static C string literal
        let value = unsafe { CStr::from_ptr(self.0) };
        value.to_str().unwrap_or_default()
    }
}

#[no_mangle]
pub static g_pluginName: PluginString = PluginString(c"dualsense_bridge".as_ptr());
#[no_mangle]
pub static g_pluginDesc: PluginString = PluginString(c"PS5 Controller Support".as_ptr());
#[no_mangle]
pub static g_pluginAuth: PluginString = PluginString(c"rmuxnet".as_ptr());
/// 1.00
#[no_mangle]
pub static g_pluginVersion: u32 = 0x0000_0100;

/// Called by the plugin loader. The first argument, if any, is the path to
/// the config file.
///
/// # Safety
/// `argv` must be null or point to `argc` C strings.
#[no_mangle]
pub unsafe extern "C" fn plugin_load(argc: i32, argv: *const *const c_char) -> i32 {
    let config_path = config_path_arg(argc, argv);
    let result = panic::catch_unwind(|| {
        super::init_logging();
        super::load(config_path.as_deref())
    });

    match result {
        Ok(Ok(())) => PLUGIN_OK,
        Ok(Err(PluginError::AlreadyLoaded)) => {
            log::warn!("Plugin is already loaded");
            PLUGIN_ERROR
        }
        Ok(Err(e)) => {
            log::error!("Unable to load plugin: {e}");
            PLUGIN_ERROR
        }
        Err(_) => PLUGIN_ERROR,
    }
}

/// Called by the plugin loader before the module is removed
///
/// # Safety
/// Arguments are ignored.
#[no_mangle]
pub unsafe extern "C" fn plugin_unload(_argc: i32, _argv: *const *const c_char) -> i32 {
    if panic::catch_unwind(super::unload).is_err() {
        return PLUGIN_ERROR;
    }
    PLUGIN_OK
}

#[no_mangle]
pub extern "C" fn module_start(_argc: i64, _args: *const c_void) -> i32 {
    PLUGIN_OK
}

#[no_mangle]
pub extern "C" fn module_stop(_argc: i64, _args: *const c_void) -> i32 {
    PLUGIN_OK
}

/// Path given as the first plugin argument
///
/// # Safety
/// `argv` must be null or point to `argc` C strings.
pub unsafe fn config_path_arg(argc: i32, argv: *const *const c_char) -> Option<PathBuf> {
    if argc < 1 || argv.is_null() {
        return None;
    }
    let arg = *argv;
    if arg.is_null() {
        return None;
    }
    let arg = CStr::from_ptr(arg).to_str().ok()?;
    if arg.is_empty() {
        return None;
    }
    Some(PathBuf::from(arg))
}
