//! Shared fixtures for the integration tests
//!
//! A trimmed job script with two TESTCASE sections, a cluster header and a
//! restart block, plus helpers to put it in a scratch directory.

#![allow(dead_code)]

use setpoint::{Catalog, ContextDefaults, DescriptorRegistry};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const JOB_SCRIPT: &str = "\
#!/bin/csh
#HELPER LINE
setenv NPX 8
setenv NPY 2
setenv NPZ 4
setenv NTIME 30:00:00

cat > src.F << '/EOF'
#if (TESTCASE == 18)
      parameter (n = 64, m = 32, l = 16)
      data zab/100./
#endif
#if (TESTCASE == 19)
      parameter (n = 128, m = 64, l = 51)
      parameter (dx00 = 20., dy00 = 20., dz00 = 20.)
      parameter (nt = 20*200, noutp = 5*200,
     &           nplot = 5*200, nstore = 10*200)
      data zab/150./, towz/100./
#endif
!HELPER LINE
      parameter (irst = 0, iwrite0 = 0)
/EOF
";

/// Registry of the built-in catalog for testcase 19
pub fn registry() -> DescriptorRegistry {
    Catalog::builtin()
        .expect("builtin catalog parses")
        .build(&ContextDefaults::for_testcase("19"), Some("19"))
        .expect("builtin catalog builds")
}

/// Scratch directory holding `job.csh` with [`JOB_SCRIPT`]
pub struct Workspace {
    pub dir: TempDir,
    pub script: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_script(JOB_SCRIPT)
    }

    pub fn with_script(text: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("job.csh");
        std::fs::write(&script, text).expect("write job script");
        Self { dir, script }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn script_text(&self) -> String {
        std::fs::read_to_string(&self.script).expect("read job script")
    }
}
