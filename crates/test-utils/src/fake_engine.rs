//! Shell scripts standing in for the external engines.
//!
//! Each script finds its output path in the `-o<path>` argument, the way the
//! simulator is invoked.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const FIND_OUTPUT: &str = r#"out=""
for a in "$@"; do
  case "$a" in
    -o?*) out="${a#-o}" ;;
  esac
done
"#;

/// Write an executable `#!/bin/sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    {
        let mut file = fs::File::create(&path).expect("create script");
        write!(file, "#!/bin/sh\n{body}").expect("write script");
        file.sync_all().expect("sync script");
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
    path
}

/// `printf` escapes for the little-endian DPB frame count.
fn dpb_header(frames: u32) -> String {
    frames
        .to_le_bytes()
        .iter()
        .map(|b| format!("\\{b:03o}"))
        .collect()
}

/// Simulator that writes a valid all-zero-delta DPB trajectory of `frames`
/// frames for `atoms` atoms, pausing `frame_delay_secs` between frames.
pub fn dpb_engine(dir: &Path, frames: u32, atoms: usize, frame_delay_secs: f64) -> PathBuf {
    let body = format!(
        "{FIND_OUTPUT}printf '{header}' > \"$out\"\n\
         i=0\n\
         while [ $i -lt {frames} ]; do\n\
         \x20 head -c {record} /dev/zero >> \"$out\"\n\
         \x20 sleep {frame_delay_secs}\n\
         \x20 i=$((i + 1))\n\
         done\n",
        header = dpb_header(frames),
        record = atoms * 3,
    );
    write_script(dir, "fake-dpb-engine", &body)
}

/// Simulator that announces `frames` DPB frames, writes only `written` of
/// them for `atoms` atoms, then hangs.
pub fn stalled_dpb_engine(dir: &Path, frames: u32, written: u32, atoms: usize) -> PathBuf {
    let body = format!(
        "{FIND_OUTPUT}printf '{header}' > \"$out\"\n\
         head -c {bytes} /dev/zero >> \"$out\"\n\
         exec sleep 30\n",
        header = dpb_header(frames),
        bytes = written as usize * atoms * 3,
    );
    write_script(dir, "fake-stalled-dpb-engine", &body)
}

/// Simulator that appends `frames` XYZ frames of `atoms` hydrogens,
/// pausing `frame_delay_secs` after each one.
pub fn xyz_engine(dir: &Path, frames: u32, atoms: usize, frame_delay_secs: f64) -> PathBuf {
    // `printf` escapes, expanded by the shell.
    let atom_lines = "H     0.000    0.000    0.000\\n".repeat(atoms);
    let body = format!(
        "{FIND_OUTPUT}: > \"$out\"\n\
         i=0\n\
         while [ $i -lt {frames} ]; do\n\
         \x20 printf '{atoms}\\nframe %d\\n{atom_lines}' $i >> \"$out\"\n\
         \x20 sleep {frame_delay_secs}\n\
         \x20 i=$((i + 1))\n\
         done\n"
    );
    write_script(dir, "fake-xyz-engine", &body)
}

/// Simulator that writes part of a trajectory and then hangs.
pub fn hanging_engine(dir: &Path) -> PathBuf {
    let body = format!("{FIND_OUTPUT}printf 'partial' > \"$out\"\nexec sleep 30\n");
    write_script(dir, "fake-hanging-engine", &body)
}

/// Engine that prints `stderr` lines and exits with `code`.
pub fn failing_engine(dir: &Path, code: i32, stderr: &[&str]) -> PathBuf {
    let mut body = String::new();
    for line in stderr {
        body.push_str(&format!("echo '{line}' >&2\n"));
    }
    body.push_str(&format!("exit {code}\n"));
    write_script(dir, "fake-failing-engine", &body)
}

/// Engine that exits 0 without writing anything.
pub fn silent_engine(dir: &Path) -> PathBuf {
    write_script(dir, "fake-silent-engine", "exit 0\n")
}

/// Engine that writes `text` to its `-o` path in one go.
pub fn text_engine(dir: &Path, text: &str) -> PathBuf {
    let body = format!("{FIND_OUTPUT}cat > \"$out\" <<'EOF'\n{text}\nEOF\n");
    write_script(dir, "fake-text-engine", &body)
}

/// GAMESS stand-in: echoes a log with a final energy to stdout.
pub fn gamess_engine(dir: &Path, energy: f64) -> PathBuf {
    let body = format!(
        "echo ' GAMESS stand-in'\n\
         echo '                  FINAL RHF ENERGY IS      {energy:.10} AFTER  10 ITERATIONS'\n"
    );
    write_script(dir, "fake-gamess", &body)
}
