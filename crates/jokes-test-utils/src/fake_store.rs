//! Shell-script stand-in for the joke-store executable
//!
//! Stores one `lang<TAB>text` line per joke in the database file and speaks
//! the same argv/stdout protocol as the real binary. Failures are reported
//! either by exit code or by the `ERROR` stdout sentinel, so both success
//! policies can be exercised end to end. Joke text must not contain quotes
//! or backslashes; the script does not escape JSON.

use jokes_core::{JokeStoreInvoker, SuccessPolicy};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STORE_SCRIPT: &str = r#"#!/bin/sh
db="$1"
cmd="$2"
touch "$db"
case "$cmd" in
  add)
    printf '%s\t%s\n' "$3" "$4" >> "$db"
    ;;
  delete)
    entry=$(printf '%s\t%s' "$3" "$4")
    if grep -qxF "$entry" "$db"; then
      grep -vxF "$entry" "$db" > "$db.tmp"
      mv "$db.tmp" "$db"
    else
      fail "no such joke"
    fi
    ;;
  get)
    if [ -n "$3" ]; then
      line=$(awk -F'\t' -v l="$3" '$1 == l { print; exit }' "$db")
    else
      line=$(head -n 1 "$db")
    fi
    [ -n "$line" ] || fail "no jokes"
    lang=$(printf '%s' "$line" | cut -f1)
    text=$(printf '%s' "$line" | cut -f2-)
    printf '{"lang":"%s","text":"%s"}\n' "$lang" "$text"
    ;;
  getall)
    awk -F'\t' 'BEGIN { printf "{\"jokes\":[" }
      { if (NR > 1) printf ","; printf "{\"lang\":\"%s\",\"text\":\"%s\"}", $1, $2 }
      END { print "]}" }' "$db"
    ;;
  *)
    fail "unknown command $cmd"
    ;;
esac
"#;

const FAIL_BY_EXIT_CODE: &str = "fail() { echo \"$1\" >&2; exit 1; }\n";
const FAIL_BY_SENTINEL: &str = "fail() { echo \"ERROR: $1\"; exit 0; }\n";

/// Write an executable `/bin/sh` script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Temporary joke store speaking one failure convention
#[derive(Debug)]
pub struct FakeStore {
    dir: TempDir,
    binary: PathBuf,
    policy: SuccessPolicy,
}

impl FakeStore {
    pub fn new(policy: SuccessPolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fail = match policy {
            SuccessPolicy::ExitCode => FAIL_BY_EXIT_CODE,
            SuccessPolicy::Sentinel => FAIL_BY_SENTINEL,
        };
        let body = STORE_SCRIPT.replacen("touch \"$db\"\n", &format!("touch \"$db\"\n{fail}"), 1);
        let binary = write_script(dir.path(), "joke-store", &body);
        Self { dir, binary, policy }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("jokes.db")
    }

    pub fn policy(&self) -> SuccessPolicy {
        self.policy
    }

    /// Invoker configured with the store's own failure convention
    pub fn invoker(&self) -> JokeStoreInvoker {
        JokeStoreInvoker::new(&self.binary, self.db_path()).with_policy(self.policy)
    }

    /// Raw database contents
    pub fn contents(&self) -> String {
        std::fs::read_to_string(self.db_path()).unwrap_or_default()
    }
}
