use std::io::{self, Read, Write};

use flate2::write::{GzEncoder, ZlibEncoder};
use sluice_api::writer::OutputStream;

/// Output compression, fixed for the lifetime of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    /// General-purpose fallback: a zlib (deflate) stream.
    Default,
}

/// Codec names recognised in `etl.output.codec`. Names are matched exactly;
/// anything else selects [`Compression::Default`].
const CODECS: &[(&str, Compression)] = &[
    ("snappy", Compression::Snappy),
    ("gzip", Compression::Gzip),
];

impl Compression {
    /// Resolve the selection from the task's compression flag and codec name.
    pub fn select(enabled: bool, codec_name: Option<&str>) -> Self {
        if !enabled {
            return Compression::None;
        }
        codec_name.map_or(Compression::Default, Self::from_codec_name)
    }

    pub fn from_codec_name(name: &str) -> Self {
        CODECS
            .iter()
            .find(|(codec, _)| *codec == name)
            .map_or(Compression::Default, |(_, c)| *c)
    }

    /// Extension appended to output file names; empty exactly for `None`.
    pub fn default_extension(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Snappy => ".snappy",
            Compression::Default => ".deflate",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Default => "deflate",
        }
    }

    /// Inverse of [`Compression::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Compression::None,
            Compression::Gzip,
            Compression::Snappy,
            Compression::Default,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }

    /// Compression of an output file, recognised by its extension.
    pub fn from_file_name(name: &str) -> Self {
        [Compression::Gzip, Compression::Snappy, Compression::Default]
            .into_iter()
            .find(|c| name.ends_with(c.default_extension()))
            .unwrap_or(Compression::None)
    }

    /// Decoder for streams produced by [`Compression::wrap`].
    pub fn reader<'a>(self, input: impl Read + 'a) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(input),
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(input)),
            Compression::Snappy => Box::new(snap::read::FrameDecoder::new(input)),
            Compression::Default => Box::new(flate2::read::ZlibDecoder::new(input)),
        }
    }

    /// Interpose the encoder between the writer and the file stream.
    pub fn wrap(self, out: Box<dyn OutputStream>) -> Box<dyn OutputStream> {
        match self {
            Compression::None => out,
            Compression::Gzip => Box::new(EncodedStream::Gzip(GzEncoder::new(
                out,
                flate2::Compression::default(),
            ))),
            Compression::Snappy => Box::new(EncodedStream::Snappy(snap::write::FrameEncoder::new(out))),
            Compression::Default => Box::new(EncodedStream::Deflate(ZlibEncoder::new(
                out,
                flate2::Compression::default(),
            ))),
        }
    }
}

/// Encoder wrapping a file stream. Finishing writes the codec trailer and then
/// finishes the inner stream.
enum EncodedStream {
    Gzip(GzEncoder<Box<dyn OutputStream>>),
    Snappy(snap::write::FrameEncoder<Box<dyn OutputStream>>),
    Deflate(ZlibEncoder<Box<dyn OutputStream>>),
}

impl Write for EncodedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EncodedStream::Gzip(e) => e.write(buf),
            EncodedStream::Snappy(e) => e.write(buf),
            EncodedStream::Deflate(e) => e.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            EncodedStream::Gzip(e) => e.write_all(buf),
            EncodedStream::Snappy(e) => e.write_all(buf),
            EncodedStream::Deflate(e) => e.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EncodedStream::Gzip(e) => e.flush(),
            EncodedStream::Snappy(e) => e.flush(),
            EncodedStream::Deflate(e) => e.flush(),
        }
    }
}

impl OutputStream for EncodedStream {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = match *self {
            EncodedStream::Gzip(e) => e.finish()?,
            EncodedStream::Snappy(e) => e
                .into_inner()
                .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?,
            EncodedStream::Deflate(e) => e.finish()?,
        };
        inner.finish()
    }
}
