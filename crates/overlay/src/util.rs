use tracing::{debug, warn};

/// Check if the injection mechanism's library is loaded into this process.
///
/// Without it the buffer-swap hook never fires and the host overlay cannot open.
#[cfg(target_os = "linux")]
pub fn injection_hook_loaded() -> bool {
    use std::fs;

    match fs::read_to_string("/proc/self/maps") {
        Ok(maps) => find_hook_mapping(&maps).is_some(),
        Err(err) => {
            debug!("cannot read /proc/self/maps. err: {err:?}");
            false
        }
    }
}

/// Check if the injection mechanism's library is loaded into this process.
///
/// Without it the buffer-swap hook never fires and the host overlay cannot open.
#[cfg(windows)]
pub fn injection_hook_loaded() -> bool {
    use windows::{Win32::System::LibraryLoader::GetModuleHandleW, core::w};

    #[cfg(target_pointer_width = "64")]
    let name = w!("GameOverlayRenderer64.dll");
    #[cfg(not(target_pointer_width = "64"))]
    let name = w!("GameOverlayRenderer.dll");

    unsafe { GetModuleHandleW(name) }.is_ok()
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn injection_hook_loaded() -> bool {
    false
}

/// Log whether the injection hook is present.
pub fn log_injection_hook() {
    if injection_hook_loaded() {
        debug!("injection hook library loaded");
    } else {
        warn!("injection hook library not loaded, host overlay will not be available");
    }
}

/// Find the `/proc/self/maps` line mapping the injection hook library.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn find_hook_mapping(maps: &str) -> Option<&str> {
    maps.lines()
        .find(|line| line.contains("gameoverlayrenderer"))
        .map(str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_hook_mapping() {
        let maps = "\
5581c8e6a000-5581c8e6c000 r--p 00000000 fd:01 1311 /usr/bin/cat
7f3a1c000000-7f3a1c200000 r-xp 00000000 fd:01 4242 /home/user/.steam/ubuntu12_64/gameoverlayrenderer.so
7f3a1d000000-7f3a1d021000 rw-p 00000000 00:00 0
";

        let line = find_hook_mapping(maps).unwrap();
        assert!(line.ends_with("gameoverlayrenderer.so"));
    }

    #[test]
    fn missing_hook_mapping() {
        let maps = "7f3a1d000000-7f3a1d021000 rw-p 00000000 00:00 0\n";
        assert_eq!(find_hook_mapping(maps), None);
    }
}
