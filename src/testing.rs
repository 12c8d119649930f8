//! Fake targets for unit tests.
//!
//! Targets are `/bin/sh` scripts run by path argument, so no executable bit
//! (and no exec of a freshly written file) is involved.

use crate::case::Target;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `body` as a shell script and return a target that runs it.
///
/// The directory must outlive the target.
pub fn fake_target(body: &str) -> (TempDir, Target) {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("target.sh");
    std::fs::write(&script, body).unwrap();
    let target =
        Target::new(PathBuf::from("/bin/sh")).with_args(vec![script.display().to_string()]);
    (dir, target)
}

/// A small `smash` lookalike that understands just enough commands for
/// the scenario tests.
pub const FAKE_SMASH: &str = r#"
set -f
job=""
while IFS= read -r line; do
  printf 'smash > '
  set -- $line
  case "$1" in
    pwd)
      if [ $# -gt 1 ]; then echo "smash error: pwd: expected 0 arguments" >&2; else pwd; fi ;;
    showpid)
      if [ $# -gt 1 ]; then echo "smash error: showpid: expected 0 arguments" >&2; else echo "smash pid is $$"; fi ;;
    echo)
      shift; echo "$@" ;;
    sleep|true)
      if [ "$3" = "&" ] || [ "$2" = "&" ]; then job="[0] $line"; fi ;;
    jobs)
      if [ -n "$job" ]; then echo "$job : 4242 0 secs"; fi ;;
    quit)
      exit 0 ;;
  esac
done
"#;
