//! Launching a JVM inside the current process.
//!
//! Used by the integration tests to call the `Java_GoBridge_*` exports with a
//! real `JNIEnv`. Gated behind the `embed` feature.
//!
//! `libjvm` is located through `JVM_LIB_PATH`, or under `JAVA_HOME`.

use std::ffi::{c_char, c_void, CString, NulError};
use std::path::{Path, PathBuf};
use std::ptr;

use jni::sys::{jint, JavaVMInitArgs, JavaVMOption, JNI_OK, JNI_VERSION_1_8};
use jni::JavaVM;
use libloading::{Library, Symbol};
use log::info;
use thiserror::Error;

type CreateJavaVmFn =
    unsafe extern "system" fn(*mut *mut jni::sys::JavaVM, *mut *mut c_void, *mut c_void) -> jint;

/// Errors returned while starting a JVM.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("invalid option (NUL byte): {0}")]
    Nul(#[from] NulError),

    #[error("failed to load libjvm: {0}")]
    Load(#[from] libloading::Error),

    #[error("JNI_CreateJavaVM failed with {0}")]
    Create(jint),

    #[error(transparent)]
    Jni(#[from] jni::errors::Error),

    #[error("{0}")]
    Locate(String),
}

fn libjvm_filename() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "jvm.dll"
    }
    #[cfg(target_os = "macos")]
    {
        "libjvm.dylib"
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        "libjvm.so"
    }
}

fn candidates_from_java_home(java_home: &Path) -> Vec<PathBuf> {
    let filename = libjvm_filename();
    let arch = std::env::consts::ARCH;

    let mut rels = vec![
        format!("lib/server/{filename}"),
        format!("jre/lib/server/{filename}"),
        format!("lib/{arch}/server/{filename}"),
        format!("jre/lib/{arch}/server/{filename}"),
    ];
    if cfg!(target_os = "windows") {
        rels.push(format!("bin/server/{filename}"));
        rels.push(format!("jre/bin/server/{filename}"));
    }

    rels.into_iter().map(|r| java_home.join(r)).collect()
}

/// Locates `libjvm` from `JVM_LIB_PATH` or `JAVA_HOME`.
pub fn find_libjvm() -> Result<PathBuf, EmbedError> {
    if let Some(path) = std::env::var_os("JVM_LIB_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        return Err(EmbedError::Locate(format!(
            "JVM_LIB_PATH is set but does not exist: {}",
            path.display()
        )));
    }

    let Some(java_home) = std::env::var_os("JAVA_HOME").map(PathBuf::from) else {
        return Err(EmbedError::Locate(
            "JAVA_HOME is not set. Set JAVA_HOME or JVM_LIB_PATH to locate libjvm.".to_string(),
        ));
    };
    candidates_from_java_home(&java_home)
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| {
            EmbedError::Locate(format!(
                "Could not find {} under JAVA_HOME={}. Set JVM_LIB_PATH explicitly.",
                libjvm_filename(),
                java_home.display()
            ))
        })
}

/// Builder for an in-process JVM.
pub struct JavaVmBuilder {
    options: Vec<CString>,
    ignore_unrecognized: bool,
}

impl Default for JavaVmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaVmBuilder {
    pub fn new() -> Self {
        JavaVmBuilder {
            options: Vec::new(),
            ignore_unrecognized: false,
        }
    }

    /// Adds a JVM option like `-Xmx64m` or `-Dkey=value`.
    pub fn option(mut self, opt: &str) -> Result<Self, EmbedError> {
        self.options.push(CString::new(opt)?);
        Ok(self)
    }

    pub fn ignore_unrecognized(mut self, value: bool) -> Self {
        self.ignore_unrecognized = value;
        self
    }

    /// Starts a JVM from `libjvm` at `path`.
    pub fn create_from_library<P: AsRef<Path>>(self, path: P) -> Result<EmbeddedJvm, EmbedError> {
        let path = path.as_ref();
        info!("starting JVM from {}", path.display());

        let lib = unsafe { Library::new(path)? };
        let create: CreateJavaVmFn = unsafe {
            let sym: Symbol<CreateJavaVmFn> = lib.get(b"JNI_CreateJavaVM\0")?;
            *sym
        };

        let mut options: Vec<JavaVMOption> = self
            .options
            .iter()
            .map(|s| JavaVMOption {
                optionString: s.as_ptr() as *mut c_char,
                extraInfo: ptr::null_mut(),
            })
            .collect();
        let mut args = JavaVMInitArgs {
            version: JNI_VERSION_1_8,
            nOptions: options.len() as jint,
            options: options.as_mut_ptr(),
            ignoreUnrecognized: u8::from(self.ignore_unrecognized),
        };

        let mut vm: *mut jni::sys::JavaVM = ptr::null_mut();
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe { create(&mut vm, &mut env, &mut args as *mut _ as *mut c_void) };
        if status != JNI_OK || vm.is_null() {
            return Err(EmbedError::Create(status));
        }

        let vm = unsafe { JavaVM::from_raw(vm)? };
        Ok(EmbeddedJvm { vm, lib: Some(lib) })
    }

    /// Starts a JVM, locating `libjvm` with [`find_libjvm`].
    pub fn create(self) -> Result<EmbeddedJvm, EmbedError> {
        let path = find_libjvm()?;
        self.create_from_library(path)
    }
}

/// A JVM running in this process.
///
/// A process can host one JVM for its whole lifetime, so dropping this handle
/// leaves the JVM running and `libjvm` loaded.
pub struct EmbeddedJvm {
    vm: JavaVM,
    lib: Option<Library>,
}

impl EmbeddedJvm {
    pub fn vm(&self) -> &JavaVM {
        &self.vm
    }
}

impl Drop for EmbeddedJvm {
    fn drop(&mut self) {
        if let Some(lib) = self.lib.take() {
            std::mem::forget(lib);
        }
    }
}
