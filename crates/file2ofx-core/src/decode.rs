//! Streaming transcoder from any supported encoding to UTF-8.

use std::io::{self, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};

/// Default read chunk, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// [`Read`] adapter that decodes its source into UTF-8.
///
/// Input is pulled in chunks of a fixed size, so memory stays bounded by the
/// chunk size whatever the file length. A leading BOM for the chosen
/// encoding is dropped; malformed sequences become U+FFFD.
///
/// ```
/// use std::io::Read;
/// use file2ofx_core::decode::DecodingReader;
///
/// let latin1 = b"caf\xe9";
/// let mut reader = DecodingReader::new(&latin1[..], encoding_rs::WINDOWS_1252, 16);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "café");
/// ```
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    /// Raw bytes read from `inner` but not yet decoded.
    input: Vec<u8>,
    input_start: usize,
    input_end: usize,
    /// Decoded bytes not yet handed to the caller.
    output: Vec<u8>,
    output_start: usize,
    output_end: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    /// Wraps `inner`, decoding it as `encoding` in chunks of `chunk_size`.
    pub fn new(inner: R, encoding: &'static Encoding, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(16);
        let decoder = encoding.new_decoder_with_bom_removal();
        let out_len =
            decoder.max_utf8_buffer_length(chunk_size).unwrap_or(chunk_size * 4 + 16);
        Self {
            inner,
            decoder,
            input: vec![0; chunk_size],
            input_start: 0,
            input_end: 0,
            output: vec![0; out_len],
            output_start: 0,
            output_end: 0,
            eof: false,
            finished: false,
        }
    }

    /// Encoding being decoded.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    /// Extracts the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decodes the next batch into `output`. Returns `false` once drained.
    fn fill_output(&mut self) -> io::Result<bool> {
        while !self.finished {
            if self.input_start == self.input_end && !self.eof {
                let n = self.inner.read(&mut self.input)?;
                self.input_start = 0;
                self.input_end = n;
                self.eof = n == 0;
            }

            let src = &self.input[self.input_start..self.input_end];
            let (result, read, written, _) =
                self.decoder.decode_to_utf8(src, &mut self.output, self.eof);
            self.input_start += read;
            self.output_start = 0;
            self.output_end = written;

            if self.eof && result == CoderResult::InputEmpty {
                self.finished = true;
            }
            if written > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.output_start == self.output_end && !self.fill_output()? {
            return Ok(0);
        }
        let n = buf.len().min(self.output_end - self.output_start);
        buf[..n].copy_from_slice(&self.output[self.output_start..self.output_start + n]);
        self.output_start += n;
        Ok(n)
    }
}
