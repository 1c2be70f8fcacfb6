#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use crate::error::{Error, Result};
use crate::process::provider::{ProcessDirectory, ProcessInfo};

#[cfg(target_os = "windows")]
use tracing::warn;

#[cfg(target_os = "windows")]
use std::ffi::OsString;
#[cfg(target_os = "windows")]
use std::os::windows::ffi::OsStringExt;
#[cfg(target_os = "windows")]
use windows::Win32::Foundation::{CloseHandle, HANDLE, HMODULE};
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW, PROCESSENTRY32W,
    Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::ProcessStatus::{
    EnumProcessModulesEx, GetModuleInformation, LIST_MODULES_ALL, MODULEINFO,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

#[cfg(target_os = "windows")]
pub struct ProcessHandle {
    handle: HANDLE,
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
}

// SAFETY: the handle is only used for ReadProcessMemory, VirtualQueryEx and
// GetExitCodeProcess, which may be called concurrently from any thread. It is
// closed exactly once in Drop.
#[cfg(target_os = "windows")]
unsafe impl Send for ProcessHandle {}
#[cfg(target_os = "windows")]
unsafe impl Sync for ProcessHandle {}

#[cfg(not(target_os = "windows"))]
pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    pub fn find_and_open(name: &str) -> Result<Self> {
        let pid = find_process_id(name).map_err(|e| {
            tracing::debug!("Process detection failed: {}", e);
            e
        })?;
        tracing::debug!("Found {} with PID {}", name, pid);
        Self::open(pid)
    }

    pub fn open(pid: u32) -> Result<Self> {
        // SAFETY: OpenProcess is called with valid flags (PROCESS_QUERY_INFORMATION | PROCESS_VM_READ)
        // and a process ID obtained from CreateToolhelp32Snapshot or the user. The returned handle
        // is managed by this struct and closed in Drop.
        let handle = unsafe {
            OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid).map_err(|e| {
                tracing::debug!("OpenProcess failed for PID {}: {}", pid, e);
                Error::AccessDenied(format!("OpenProcess({}): {}", pid, e))
            })?
        };

        let (base_address, module_size) = match get_module_info(handle) {
            Ok(info) => info,
            Err(e) => {
                // SAFETY: handle was just returned by OpenProcess and is not stored anywhere.
                let _ = unsafe { CloseHandle(handle) };
                return Err(e);
            }
        };

        Ok(Self {
            handle,
            pid,
            base_address,
            module_size,
        })
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }

    /// Check if the process is still running
    pub fn is_alive(&self) -> bool {
        const STILL_ACTIVE: u32 = 259;

        let mut exit_code: u32 = 0;
        // SAFETY: GetExitCodeProcess is called with a valid process handle obtained from OpenProcess.
        // The exit_code variable is properly initialized and passed by mutable reference.
        unsafe {
            if GetExitCodeProcess(self.handle, &mut exit_code).is_ok() {
                exit_code == STILL_ACTIVE
            } else {
                false
            }
        }
    }

    /// Load address of a module in this process
    pub fn module_base(&self, module_name: &str) -> Result<u64> {
        find_module_base(self.pid, module_name)
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessHandle {
    pub fn find_and_open(_name: &str) -> Result<Self> {
        Err(Error::ProcessNotFound(
            "Windows only: process access not supported on this platform".to_string(),
        ))
    }

    pub fn open(_pid: u32) -> Result<Self> {
        Err(Error::ProcessNotFound(
            "Windows only: process access not supported on this platform".to_string(),
        ))
    }

    /// Check if the process is still running (stub for non-Windows)
    pub fn is_alive(&self) -> bool {
        false
    }

    pub fn module_base(&self, module_name: &str) -> Result<u64> {
        Err(Error::ModuleNotFound(module_name.to_string()))
    }
}

impl ProcessInfo for ProcessHandle {
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
        ProcessHandle::is_alive(self)
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            // SAFETY: self.handle is a valid handle obtained from OpenProcess and has not been
            // closed yet. CloseHandle is safe to call on a valid handle.
            if let Err(e) = unsafe { CloseHandle(self.handle) } {
                warn!("Failed to close process handle: {}", e);
            }
        }
    }
}

/// Process directory backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDirectory;

impl ProcessDirectory for SystemDirectory {
    type Process = ProcessHandle;

    #[cfg(target_os = "windows")]
    fn find_process_id(&self, name: &str) -> Result<u32> {
        find_process_id(name)
    }

    #[cfg(not(target_os = "windows"))]
    fn find_process_id(&self, name: &str) -> Result<u32> {
        Err(Error::ProcessNotFound(format!(
            "{}: process access not supported on this platform",
            name
        )))
    }

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        ProcessHandle::open(pid)
    }

    #[cfg(target_os = "windows")]
    fn module_base(&self, pid: u32, module_name: &str) -> Result<u64> {
        find_module_base(pid, module_name)
    }

    #[cfg(not(target_os = "windows"))]
    fn module_base(&self, _pid: u32, module_name: &str) -> Result<u64> {
        Err(Error::ModuleNotFound(module_name.to_string()))
    }
}

#[cfg(target_os = "windows")]
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    OsString::from_wide(&wide[..len])
        .to_string_lossy()
        .into_owned()
}

#[cfg(target_os = "windows")]
fn find_process_id(name: &str) -> Result<u32> {
    // SAFETY: CreateToolhelp32Snapshot with TH32CS_SNAPPROCESS is safe to call.
    // The returned handle is closed at the end of this function.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(e.to_string()))?
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut result = Err(Error::ProcessNotFound(format!(
        "Process '{}' not found",
        name
    )));

    // SAFETY: Process32FirstW and Process32NextW are safe to call with a valid snapshot handle
    // and properly initialized PROCESSENTRY32W structure.
    unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(name) {
                    result = Ok(entry.th32ProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
    }

    // SAFETY: snapshot is a valid handle from CreateToolhelp32Snapshot
    let _ = unsafe { CloseHandle(snapshot) };
    result
}

#[cfg(target_os = "windows")]
fn find_module_base(pid: u32, module_name: &str) -> Result<u64> {
    // SAFETY: a module snapshot of another process only requires a valid PID. The returned
    // handle is closed at the end of this function.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
            .map_err(|e| Error::AccessDenied(format!("Module snapshot of {}: {}", pid, e)))?
    };

    let mut entry = MODULEENTRY32W {
        dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
        ..Default::default()
    };

    let mut result = Err(Error::ModuleNotFound(module_name.to_string()));

    // SAFETY: Module32FirstW and Module32NextW are called with a valid snapshot handle and a
    // properly sized MODULEENTRY32W.
    unsafe {
        if Module32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                if wide_to_string(&entry.szModule).eq_ignore_ascii_case(module_name) {
                    result = Ok(entry.modBaseAddr as u64);
                    break;
                }
                if Module32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
    }

    // SAFETY: snapshot is a valid handle from CreateToolhelp32Snapshot
    let _ = unsafe { CloseHandle(snapshot) };
    result
}

#[cfg(target_os = "windows")]
fn get_module_info(handle: HANDLE) -> Result<(u64, u32)> {
    let mut modules = [HMODULE::default(); 1024];
    let mut needed: u32 = 0;

    // SAFETY: EnumProcessModulesEx is called with a valid process handle from OpenProcess,
    // and the modules array is large enough to hold typical module counts. The needed
    // parameter receives the actual bytes required.
    unsafe {
        EnumProcessModulesEx(
            handle,
            modules.as_mut_ptr(),
            (modules.len() * std::mem::size_of::<HMODULE>()) as u32,
            &mut needed,
            LIST_MODULES_ALL,
        )
        .map_err(|e| Error::AccessDenied(format!("Failed to enumerate modules: {}", e)))?;
    }

    if needed == 0 {
        return Err(Error::AccessDenied("No modules found in process".to_string()));
    }

    let mut info = MODULEINFO::default();
    // SAFETY: GetModuleInformation is called with a valid process handle and the first module
    // handle from the enumeration. The info struct is properly sized.
    unsafe {
        GetModuleInformation(
            handle,
            modules[0],
            &mut info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
        .map_err(|e| Error::AccessDenied(format!("Failed to get module info: {}", e)))?;
    }

    Ok((info.lpBaseOfDll as u64, info.SizeOfImage))
}
