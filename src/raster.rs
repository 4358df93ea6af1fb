use crate::assets;
use crate::config::{Config, RasterizerDialect};
use anyhow::{Context, bail};
use log::{info, warn};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};

const QUIT_COMMAND: &str = "quit";

/// One shell command converting `input` into a `size`x`size` PNG at `output`.
/// Paths always use `/` separators.
pub fn command_line(dialect: RasterizerDialect, input: &Path, output: &Path, size: u32) -> String {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();
    let line = match dialect {
        RasterizerDialect::Legacy => format!("-f {input} -e {output} -w {size} -h {size}"),
        RasterizerDialect::Actions => format!(
            "file-open:{input}; export-width:{size}; export-height:{size}; \
             export-filename:{output}; export-do; file-close"
        ),
    };
    line.replace('\\', "/")
}

/// A long-lived vector converter driven through its interactive shell.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: String,
    args: Vec<String>,
    dialect: RasterizerDialect,
}

impl Rasterizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, dialect: RasterizerDialect) -> Self {
        Self {
            program: program.into(),
            args,
            dialect,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.rasterizer.clone(),
            cfg.rasterizer_args.clone(),
            cfg.rasterizer_dialect,
        )
    }

    /// Converts every `.svg` in `input_dir` to `<stem>.png` in `output_dir`.
    ///
    /// Commands are streamed to one converter process, which is then told to
    /// quit and waited on. Output files are not checked; a non-zero exit is
    /// only logged. Returns the number of commands issued.
    pub fn rasterize_dir(&self, input_dir: &Path, output_dir: &Path, size: u32) -> anyhow::Result<usize> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;
        let inputs = assets::listed_files(input_dir, "svg")?;

        info!(
            "Rasterizing {} SVGs from '{}' at {size}x{size} with '{}'",
            inputs.len(),
            input_dir.display(),
            self.program
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start rasterizer '{}'", self.program))?;
        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            bail!("Rasterizer '{}' has no stdin pipe", self.program);
        };

        let mut script = BufWriter::new(stdin);
        let mut issued = 0usize;
        for input in &inputs {
            let Some(stem) = assets::file_stem(input) else {
                warn!("Skipping '{}': file name is not UTF-8", input.display());
                continue;
            };
            let output = output_dir.join(format!("{stem}.png"));
            let line = command_line(self.dialect, input, &output, size);
            if let Err(e) = writeln!(script, "{line}") {
                warn!("Rasterizer stopped accepting commands after {issued}: {e}");
                break;
            }
            issued += 1;
        }
        if let Err(e) = writeln!(script, "{QUIT_COMMAND}").and_then(|()| script.flush()) {
            warn!("Failed to send '{QUIT_COMMAND}' to rasterizer: {e}");
        }
        // Closing stdin lets the converter see EOF even if it ignored `quit`.
        drop(script);

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for rasterizer '{}'", self.program))?;
        if status.success() {
            info!("Rasterizer finished after {issued} commands.");
        } else {
            warn!("Rasterizer exited with {status} after {issued} commands.");
        }
        Ok(issued)
    }
}
