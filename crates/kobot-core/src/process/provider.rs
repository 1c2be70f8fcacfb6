//! Process provider abstraction for testability.
//!
//! This module provides traits that abstract process discovery and access,
//! enabling mock implementations for testing without a running game process.

use crate::error::Result;

/// Trait for accessing process information.
///
/// This trait abstracts the properties of a process handle, allowing
/// mock implementations for testing.
pub trait ProcessInfo {
    /// Get the process ID.
    fn pid(&self) -> u32;

    /// Get the base address of the main module.
    fn base_address(&self) -> u64;

    /// Get the size of the main module.
    fn module_size(&self) -> u32;

    /// Check if the process is still running.
    fn is_alive(&self) -> bool;
}

/// Trait for finding and opening processes and looking up their modules.
pub trait ProcessDirectory {
    /// The type of process info returned by this directory.
    type Process: ProcessInfo;

    /// Find the PID of a running process by executable name (case-insensitive).
    fn find_process_id(&self, name: &str) -> Result<u32>;

    /// Open a process by its PID.
    fn open_process(&self, pid: u32) -> Result<Self::Process>;

    /// Load address of `module_name` inside process `pid`.
    fn module_base(&self, pid: u32, module_name: &str) -> Result<u64>;

    /// Find and open a process by executable name.
    fn find_and_open(&self, name: &str) -> Result<Self::Process> {
        let pid = self.find_process_id(name)?;
        self.open_process(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Mock process info for testing.
    pub struct MockProcessInfo {
        pub pid: u32,
        pub base_address: u64,
        pub module_size: u32,
        pub alive: bool,
    }

    impl ProcessInfo for MockProcessInfo {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn base_address(&self) -> u64 {
            self.base_address
        }

        fn module_size(&self) -> u32 {
            self.module_size
        }

        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    /// Mock directory with at most one process and a fixed module table.
    pub struct MockDirectory {
        pub process: Option<(String, u32)>,
        pub modules: Vec<(String, u64)>,
    }

    impl ProcessDirectory for MockDirectory {
        type Process = MockProcessInfo;

        fn find_process_id(&self, name: &str) -> Result<u32> {
            self.process
                .as_ref()
                .filter(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, pid)| *pid)
                .ok_or_else(|| Error::ProcessNotFound(name.to_string()))
        }

        fn open_process(&self, pid: u32) -> Result<Self::Process> {
            self.process
                .as_ref()
                .filter(|(_, p)| *p == pid)
                .map(|_| MockProcessInfo {
                    pid,
                    base_address: 0x400000,
                    module_size: 0x100000,
                    alive: true,
                })
                .ok_or_else(|| Error::AccessDenied(format!("Mock process {} not found", pid)))
        }

        fn module_base(&self, _pid: u32, module_name: &str) -> Result<u64> {
            self.modules
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(module_name))
                .map(|(_, base)| *base)
                .ok_or_else(|| Error::ModuleNotFound(module_name.to_string()))
        }
    }

    fn directory() -> MockDirectory {
        MockDirectory {
            process: Some(("Game.exe".to_string(), 1234)),
            modules: vec![("Game.exe".to_string(), 0x400000)],
        }
    }

    #[test]
    fn test_mock_process_info() {
        let info = MockProcessInfo {
            pid: 1234,
            base_address: 0x140000000,
            module_size: 0x1000000,
            alive: true,
        };

        assert_eq!(info.pid(), 1234);
        assert_eq!(info.base_address(), 0x140000000);
        assert_eq!(info.module_size(), 0x1000000);
        assert!(info.is_alive());
    }

    #[test]
    fn test_find_and_open() {
        let process = directory().find_and_open("game.exe").unwrap();
        assert_eq!(process.pid(), 1234);
    }

    #[test]
    fn test_find_not_found() {
        let result = directory().find_and_open("other.exe");
        assert!(matches!(result, Err(Error::ProcessNotFound(_))));
    }

    #[test]
    fn test_open_wrong_pid() {
        assert!(matches!(
            directory().open_process(9999),
            Err(Error::AccessDenied(_))
        ));
    }

    #[test]
    fn test_module_base() {
        let dir = directory();
        assert_eq!(dir.module_base(1234, "GAME.EXE").unwrap(), 0x400000);
        assert!(matches!(
            dir.module_base(1234, "missing.dll"),
            Err(Error::ModuleNotFound(_))
        ));
    }
}
