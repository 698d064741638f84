//! MML compiler - routes source lines to channels and compiles them
//!
//! Each of the driver's three voices has its own [`ChannelCompiler`]. A source
//! line belongs to the voice named by its first letter (`D`, `E` or `F`); the
//! rest of the line is MML for that voice.

pub mod channel;
pub mod command;
pub mod cursor;
pub mod length;
pub mod nest;
pub mod note;
pub mod output;
pub mod param;

use crate::config::CompilerConfig;
use crate::driver::{self, CHANNEL_COUNT, CHANNEL_NAMES};
use crate::error::{CompileError, Diagnostic, Error, Result};
pub use channel::ChannelCompiler;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// What a source line is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// MML for a channel; the text starts at the given byte offset
    Channel(usize, usize),
    /// `X` line: toggles compilation on and off
    Toggle,
    /// Anything else
    Ignore,
}

/// Song compiler state
pub struct Compiler {
    config: CompilerConfig,
    channels: [ChannelCompiler; CHANNEL_COUNT],
    /// Every line read so far, for diagnostics
    sources: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    /// Set between `X` lines
    disabled: bool,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        let capacity = config.capacity;
        Self {
            config,
            channels: std::array::from_fn(|_| ChannelCompiler::new(capacity)),
            sources: Vec::new(),
            diagnostics: Vec::new(),
            disabled: false,
        }
    }

    /// Compile MML input and write the image to `output`
    pub fn compile<R: Read>(&mut self, input: R, output: &Path) -> Result<()> {
        let image = self.compile_to_image(input)?;
        fs::write(output, image)?;
        Ok(())
    }

    /// Compile an MML file and write the image to `output`
    pub fn compile_file(&mut self, input: &Path, output: &Path) -> Result<()> {
        let file = File::open(input).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open '{}': {}", input.display(), e),
            ))
        })?;
        self.compile(file, output)
    }

    /// Compile MML input into an image in memory.
    ///
    /// Each call compiles a new song from scratch. Lines are taken as raw
    /// bytes, so comments in any encoding pass through.
    pub fn compile_to_image<R: Read>(&mut self, input: R) -> Result<Vec<u8>> {
        self.reset();
        let mut reader = BufReader::new(input);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.feed_line(&line);
        }
        self.finish()
    }

    /// Forget every line, channel and diagnostic seen so far
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Route and compile one source line
    pub fn feed_line(&mut self, line: impl AsRef<[u8]>) {
        let line = line.as_ref();
        self.sources.push(String::from_utf8_lossy(line).into_owned());
        let line_no = self.sources.len();

        match route(line) {
            Route::Channel(index, start) if !self.disabled => {
                if let Err(error) = self.channels[index].compile_line(&line[start..], line_no) {
                    self.report(index, error);
                }
            }
            Route::Channel(index, _) => {
                if self.config.verbose {
                    let what = format!("channel {} skipped (disabled by X)", CHANNEL_NAMES[index]);
                    eprintln!("{}", skip_message(line_no, &what, &self.sources[line_no - 1]));
                }
            }
            Route::Toggle => self.disabled = !self.disabled,
            Route::Ignore => {
                if self.config.verbose {
                    eprintln!("{}", skip_message(line_no, "ignored", &self.sources[line_no - 1]));
                }
            }
        }
    }

    /// Close every channel and assemble the image
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        for index in 0..CHANNEL_COUNT {
            if let Err(error) = self.channels[index].finish() {
                self.report(index, error);
            }
        }

        if !self.diagnostics.is_empty() {
            return Err(Error::Compile {
                diagnostics: std::mem::take(&mut self.diagnostics),
            });
        }

        let image = driver::assemble(
            std::array::from_fn(|i| self.channels[i].bytes()),
            self.config.base_address,
        )?;

        if self.config.verbose {
            let mut address = usize::from(self.config.base_address) + driver::HEADER_SIZE;
            for (name, channel) in CHANNEL_NAMES.iter().zip(&self.channels) {
                eprintln!("channel {}: {} bytes at ${:04X}", name, channel.len(), address);
                address += channel.len();
            }
        }

        Ok(image)
    }

    /// Compiler for channel `index` (0 = D, 1 = E, 2 = F)
    pub fn channel(&self, index: usize) -> Option<&ChannelCompiler> {
        self.channels.get(index)
    }

    /// Errors collected so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Record an error, converting its column to one in the full source line
    fn report(&mut self, index: usize, mut error: CompileError) {
        let source = error
            .line
            .checked_sub(1)
            .and_then(|i| self.sources.get(i))
            .cloned()
            .unwrap_or_default();
        if let Route::Channel(_, start) = route(source.as_bytes()) {
            error.column += start;
        }
        self.diagnostics.push(Diagnostic {
            channel: CHANNEL_NAMES[index],
            error,
            source,
        });
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Verbose trace of a line that was not compiled, echoing its text
fn skip_message(line_no: usize, what: &str, text: &str) -> String {
    format!("line {}: {}: {}", line_no, what, text)
}

/// Decide where a line goes.
///
/// Leading blanks are skipped, and so is a legacy `123 "` line-number prefix.
fn route(bytes: &[u8]) -> Route {
    let mut pos = 0;
    let skip = |pos: &mut usize, pred: fn(u8) -> bool| {
        while bytes.get(*pos).is_some_and(|&b| pred(b)) {
            *pos += 1;
        }
    };

    skip(&mut pos, |b| b == b' ' || b == b'\t');
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        skip(&mut pos, |b| b.is_ascii_digit());
        skip(&mut pos, |b| b == b' ');
        if bytes.get(pos) == Some(&b'"') {
            pos += 1;
        }
    }

    match bytes.get(pos).map(u8::to_ascii_uppercase) {
        Some(b'X') => Route::Toggle,
        Some(letter) => match CHANNEL_NAMES.iter().position(|&c| c as u8 == letter) {
            Some(index) => Route::Channel(index, pos + 1),
            None => Route::Ignore,
        },
        None => Route::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn compile(src: &str) -> Result<Vec<u8>> {
        Compiler::default().compile_to_image(Cursor::new(src))
    }

    #[test]
    fn test_route() {
        assert_eq!(route(b"D CDE"), Route::Channel(0, 1));
        assert_eq!(route(b"  e cde"), Route::Channel(1, 3));
        assert_eq!(route(b"\tF"), Route::Channel(2, 2));
        assert_eq!(route(b"10 \"D CDE"), Route::Channel(0, 6));
        assert_eq!(route(b"20D"), Route::Channel(0, 3));
        assert_eq!(route(b"X"), Route::Toggle);
        assert_eq!(route(b"x comment"), Route::Toggle);
        assert_eq!(route(b"A CDE"), Route::Ignore);
        assert_eq!(route(b""), Route::Ignore);
        assert_eq!(route(b"123"), Route::Ignore);
    }

    #[test]
    fn test_skip_message_echoes_line() {
        assert_eq!(
            skip_message(7, "ignored", "#TITLE demo"),
            "line 7: ignored: #TITLE demo"
        );
    }

    #[test]
    fn test_channels_assembled_in_order() {
        let image = compile("D C\nE D\nF E\n").unwrap();
        assert_eq!(
            image,
            vec![0x08, 0x00, 0x0A, 0x00, 0x0C, 0x00, 0x00, 0x00, 0x01, 0xFF, 0x03, 0xFF, 0x05, 0xFF]
        );
    }

    #[test]
    fn test_x_lines_toggle() {
        let image = compile("D C\nX\nD D\nE D\nX\nD E\n").unwrap();
        assert_eq!(&image[8..], &[0x01, 0x05, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_all_errors_reported() {
        let err = compile("D V16\nE O9\nF [C\nD C\n").unwrap_err();
        let Error::Compile { diagnostics } = err else {
            panic!("expected compile error");
        };
        let kinds: Vec<_> = diagnostics.iter().map(|d| (d.channel, d.error.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ('D', ErrorKind::ParameterRange),
                ('E', ErrorKind::OctaveRange),
                ('F', ErrorKind::UnclosedNest),
            ]
        );
        let unclosed = &diagnostics[2];
        assert_eq!(unclosed.error.line, 3);
        assert_eq!(unclosed.error.column, 3);
        assert_eq!(unclosed.source, "F [C");
    }

    #[test]
    fn test_error_column_in_source_line() {
        let err = compile("  D C D Z").unwrap_err();
        let Error::Compile { diagnostics } = err else {
            panic!("expected compile error");
        };
        assert_eq!(diagnostics[0].error.kind, ErrorKind::Syntax);
        assert_eq!(diagnostics[0].error.column, 9);
        assert_eq!(diagnostics[0].to_string(), "error: [D] character is not part of the MML command set (line 1, column 9)\n  D C D Z\n        ^");
    }

    #[test]
    fn test_base_address_config() {
        let config = CompilerConfig {
            base_address: 0x4000,
            ..CompilerConfig::default()
        };
        let image = Compiler::new(config).compile_to_image(Cursor::new("D C")).unwrap();
        assert_eq!(&image[..6], &[0x08, 0x40, 0x0A, 0x40, 0x0B, 0x40]);
    }

    #[test]
    fn test_non_utf8_bytes() {
        // Shift-JIS comment
        let image = Compiler::default()
            .compile_to_image(Cursor::new(&b"D c ;\x83\x68\x83\x8C\nD d\n"[..]))
            .unwrap();
        assert_eq!(&image[8..], &[0x01, 0x03, 0xFF, 0xFF, 0xFF]);

        let err = Compiler::default()
            .compile_to_image(Cursor::new(&b"E c\nD \x83 c\r\n"[..]))
            .unwrap_err();
        let Error::Compile { diagnostics } = err else {
            panic!("expected compile error");
        };
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error.kind, ErrorKind::Syntax);
        assert_eq!((diagnostics[0].error.line, diagnostics[0].error.column), (2, 3));
        assert_eq!(diagnostics[0].source, "D \u{FFFD} c");
    }

    #[test]
    fn test_same_song_same_image() {
        let song = "D t150,2 l8 o3 [ c d _3 e : > f16 g ]4 < a4.\n\
                    E _-2 [ l16 c [ d e ]3 : r ]2 o5 b%30\n\
                    F p1 w10 [ c ]2 j d\n";
        let first = compile(song).unwrap();
        let second = compile(song).unwrap();
        assert!(first.len() > 30);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reuse_starts_new_song() {
        let mut compiler = Compiler::default();
        let first = compiler.compile_to_image(Cursor::new("D c")).unwrap();
        assert_eq!(&first[8..], &[0x01, 0xFF, 0xFF, 0xFF]);

        let second = compiler.compile_to_image(Cursor::new("X\nX\nD d e f")).unwrap();
        assert_eq!(&second[8..], &[0x03, 0x05, 0x06, 0xFF, 0xFF, 0xFF]);

        for _ in 0..2 {
            let Err(Error::Compile { diagnostics }) = compiler.compile_to_image(Cursor::new("D c\nD z")) else {
                panic!("expected compile error");
            };
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].error.line, 2);
        }
        assert!(compiler.diagnostics().is_empty());
    }
}
