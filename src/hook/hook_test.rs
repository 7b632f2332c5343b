use std::{
    error::Error,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use crate::{
    config::HookConfig,
    hook::{detour::DetourPatcher, HookBinding, HookError, Patcher, Redirect},
};

type AddFn = unsafe extern "C" fn(i32, i32) -> i32;

extern "C" fn original_add(a: i32, b: i32) -> i32 {
    a + b
}

extern "C" fn shim_add(a: i32, b: i32) -> i32 {
    a * b
}

#[derive(Default)]
struct Counters {
    enabled: AtomicU32,
    disabled: AtomicU32,
}

struct MockRedirect {
    counters: Arc<Counters>,
    reject_enable: bool,
}

impl Redirect for MockRedirect {
    fn original(&self) -> *const () {
        original_add as *const ()
    }

    unsafe fn enable(&self) -> Result<(), HookError> {
        if self.reject_enable {
            return Err(HookError::PatchRejected("write protected".to_string()));
        }
        self.counters.enabled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    unsafe fn disable(&self) -> Result<(), HookError> {
        self.counters.disabled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockPatcher {
    counters: Arc<Counters>,
    reject_redirect: bool,
    reject_enable: bool,
}

impl Patcher for MockPatcher {
    type Module = String;

    fn load_module(&self, name: &str) -> Result<Self::Module, HookError> {
        if name != "libScePad.sprx" {
            return Err(HookError::ModuleNotFound(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn resolve_symbol(&self, _module: &Self::Module, name: &str) -> Result<*const (), HookError> {
        match name {
            "scePadRead" => Ok(original_add as *const ()),
            "scePadNull" => Ok(std::ptr::null()),
            _ => Err(HookError::SymbolNotFound(name.to_string())),
        }
    }

    unsafe fn redirect(
        &self,
        target: *const (),
        shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError> {
        assert!(!target.is_null());
        assert!(!shim.is_null());
        if self.reject_redirect {
            return Err(HookError::PatchRejected("unsupported prologue".to_string()));
        }
        Ok(Box::new(MockRedirect {
            counters: self.counters.clone(),
            reject_enable: self.reject_enable,
        }))
    }
}

fn hook_config(module: &str, symbol: &str) -> HookConfig {
    HookConfig {
        module: module.to_string(),
        symbol: symbol.to_string(),
    }
}

fn install(patcher: &MockPatcher, config: &HookConfig) -> Result<HookBinding<AddFn>, HookError> {
    unsafe { HookBinding::install(patcher, config, shim_add as AddFn) }
}

#[test]
fn test_install_hook() -> Result<(), Box<dyn Error>> {
    let patcher = MockPatcher::default();
    let binding = install(&patcher, &HookConfig::default())?;
    assert!(binding.is_enabled());
    assert_eq!(binding.symbol(), "scePadRead");
    assert_eq!(patcher.counters.enabled.load(Ordering::SeqCst), 1);

    // The original stays callable
    let original = binding.original();
    assert_eq!(unsafe { original(2, 3) }, 5);

    // Enabling again does nothing
    unsafe { binding.enable()? };
    assert_eq!(patcher.counters.enabled.load(Ordering::SeqCst), 1);

    binding.release();
    assert!(!binding.is_enabled());
    assert_eq!(patcher.counters.disabled.load(Ordering::SeqCst), 1);

    // Already released, dropping does not disable twice
    drop(binding);
    assert_eq!(patcher.counters.disabled.load(Ordering::SeqCst), 1);

    Ok(())
}

#[test]
fn test_prepare_then_enable() -> Result<(), Box<dyn Error>> {
    let patcher = MockPatcher::default();
    let binding =
        unsafe { HookBinding::prepare(&patcher, &HookConfig::default(), shim_add as AddFn)? };
    assert!(!binding.is_enabled());
    assert_eq!(patcher.counters.enabled.load(Ordering::SeqCst), 0);
    assert_eq!(unsafe { binding.original()(4, 4) }, 8);

    unsafe { binding.enable()? };
    assert!(binding.is_enabled());

    // Dropping an enabled binding releases it
    drop(binding);
    assert_eq!(patcher.counters.disabled.load(Ordering::SeqCst), 1);

    Ok(())
}

#[test]
fn test_install_failures() {
    let patcher = MockPatcher::default();

    let result = install(&patcher, &hook_config("libSceMissing.sprx", "scePadRead"));
    assert_eq!(
        result.err(),
        Some(HookError::ModuleNotFound("libSceMissing.sprx".to_string()))
    );

    let result = install(&patcher, &hook_config("libScePad.sprx", "scePadMissing"));
    assert_eq!(
        result.err(),
        Some(HookError::SymbolNotFound("scePadMissing".to_string()))
    );

    let result = install(&patcher, &hook_config("libScePad.sprx", "scePadNull"));
    assert_eq!(
        result.err(),
        Some(HookError::SymbolNotFound("scePadNull".to_string()))
    );

    let result = install(&patcher, &hook_config("libScePad.sprx", ""));
    assert_eq!(result.err(), Some(HookError::InvalidName(String::new())));

    let result = install(&patcher, &hook_config("libScePad\0.sprx", "scePadRead"));
    assert!(matches!(result, Err(HookError::InvalidName(_))));
}

#[test]
fn test_patch_rejected() {
    let patcher = MockPatcher {
        reject_redirect: true,
        ..Default::default()
    };
    let result = install(&patcher, &HookConfig::default());
    assert!(matches!(result, Err(HookError::PatchRejected(_))));

    let patcher = MockPatcher {
        reject_enable: true,
        ..Default::default()
    };
    let result = install(&patcher, &HookConfig::default());
    assert!(matches!(result, Err(HookError::PatchRejected(_))));
    assert_eq!(patcher.counters.disabled.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[test]
fn test_detour_patcher_missing_module() {
    let patcher = DetourPatcher;
    let result = patcher.load_module("libdualsense-bridge-missing.so");
    assert_eq!(
        result.err(),
        Some(HookError::ModuleNotFound(
            "libdualsense-bridge-missing.so".to_string()
        ))
    );
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_detour_patcher_resolve() -> Result<(), Box<dyn Error>> {
    let patcher = DetourPatcher;
    let libc = patcher.load_module("libc.so.6")?;
    let address = patcher.resolve_symbol(&libc, "strlen")?;
    assert!(!address.is_null());

    let result = patcher.resolve_symbol(&libc, "scePadRead");
    assert_eq!(
        result.err(),
        Some(HookError::SymbolNotFound("scePadRead".to_string()))
    );

    Ok(())
}

#[cfg(all(unix, any(target_arch = "x86", target_arch = "x86_64")))]
mod inline_redirect {
    use std::{error::Error, hint::black_box, mem};

    use super::AddFn;
    use crate::hook::{detour::DetourPatcher, Patcher};

    // Volatile reads keep the prologue long enough to hold the jump
    #[inline(never)]
    extern "C" fn detour_target(a: i32, b: i32) -> i32 {
        unsafe { std::ptr::read_volatile(&a as *const i32) + b }
    }

    #[inline(never)]
    extern "C" fn detour_shim(a: i32, b: i32) -> i32 {
        unsafe { std::ptr::read_volatile(&a as *const i32) - b }
    }

    #[test]
    fn test_detour_patcher_redirect() -> Result<(), Box<dyn Error>> {
        let target = black_box(detour_target as AddFn);
        let redirect = unsafe {
            DetourPatcher.redirect(detour_target as *const (), detour_shim as *const ())?
        };

        // Built disabled
        assert_eq!(unsafe { target(5, 3) }, 8);

        unsafe { redirect.enable()? };
        assert_eq!(unsafe { target(5, 3) }, 2);

        // The trampoline still runs the original code
        let original: AddFn = unsafe { mem::transmute(redirect.original()) };
        assert_eq!(unsafe { original(5, 3) }, 8);

        unsafe { redirect.disable()? };
        assert_eq!(unsafe { target(5, 3) }, 8);

        Ok(())
    }
}
