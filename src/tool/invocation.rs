//! Argument list construction for ffmpeg

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the tool's stdout and stderr go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Both streams written to this file, truncating it first
    File(PathBuf),
    /// Streams shared with the current process
    Inherit,
    /// Streams discarded
    Discard,
}

/// A single run of the external tool: its arguments and output routing
///
/// Arguments are kept as discrete values and handed to the process without a
/// shell, so sources and filenames containing spaces or shell metacharacters
/// reach the tool unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
    output: ToolOutput,
}

impl Invocation {
    /// Build an invocation from raw arguments
    pub fn new<I, S>(args: I, output: ToolOutput) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            output,
        }
    }

    /// Build the stream-copy invocation used for every download:
    ///
    /// `-nostdin -n [-http_proxy <proxy>] -i <source> -c copy <output_path>`
    ///
    /// `-n` makes ffmpeg refuse to overwrite an existing output file and
    /// `-nostdin` keeps parallel runs from competing for the terminal.
    pub fn ffmpeg_copy(
        source: &str,
        output_path: &Path,
        proxy_url: Option<&str>,
        output: ToolOutput,
    ) -> Self {
        let mut args: Vec<OsString> = vec!["-nostdin".into(), "-n".into()];

        if let Some(proxy) = proxy_url {
            args.push("-http_proxy".into());
            args.push(proxy.into());
        }

        args.push("-i".into());
        args.push(source.into());
        args.push("-c".into());
        args.push("copy".into());
        args.push(output_path.as_os_str().to_owned());

        Self { args, output }
    }

    /// Arguments passed to the tool, excluding the program name
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Output routing
    pub fn output(&self) -> &ToolOutput {
        &self.output
    }

    /// The diagnostic log file, when output goes to one
    pub fn log_path(&self) -> Option<&Path> {
        match &self.output {
            ToolOutput::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Renders the arguments as a single line for logging; arguments containing
/// whitespace are quoted. This is not meant to be fed back to a shell.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write_arg(f, arg)?;
        }
        Ok(())
    }
}

fn write_arg(f: &mut fmt::Formatter<'_>, arg: &OsStr) -> fmt::Result {
    let arg = arg.to_string_lossy();
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        write!(f, "{:?}", arg)
    } else {
        f.write_str(&arg)
    }
}
