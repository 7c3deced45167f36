//! External media tool handling
//!
//! Downloads are performed by an external program (ffmpeg) that remuxes the
//! HLS stream into a local container without re-encoding. This module holds
//! the seam between the dispatcher and that program:
//!
//! - [`Invocation`]: the argument list for one run, plus where its output goes
//! - [`ToolRunner`]: the spawn capability, implemented by [`FfmpegRunner`] for
//!   real runs and by fakes in tests
//!
//! ## Usage
//!
//! ```no_run
//! use hls_dl::tool::{FfmpegRunner, Invocation, ToolOutput, ToolRunner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = FfmpegRunner::from_path().expect("ffmpeg not found in PATH");
//!
//!     let invocation = Invocation::ffmpeg_copy(
//!         "https://example.com/stream/index.m3u8",
//!         Path::new("video.mp4"),
//!         None,
//!         ToolOutput::Discard,
//!     );
//!
//!     let exit = runner.run(&invocation).await?;
//!     println!("ffmpeg exited with {:?}", exit.code);
//!     Ok(())
//! }
//! ```

mod cli;
mod invocation;
mod traits;

pub use cli::FfmpegRunner;
pub use invocation::{Invocation, ToolOutput};
pub use traits::{ToolExit, ToolRunner};
