//! Binary PPM (P6) demuxer
//!
//! Live decoders pipe a stream of concatenated P6 images. Each call to
//! [`read_ppm_frame`] pulls the next image with the expected dimensions out
//! of that stream.
//!
//! A frame that cannot be used is reported as `Ok(None)` rather than an
//! error: a stream that closed mid-frame, a header that does not parse, or
//! an image whose size or maxval differ from what was asked for. The
//! caller treats all of these as "no frame this time" and reconnects.
//!
//! ```rust
//! use std::io::Cursor;
//! use tilewall_frame::read_ppm_frame;
//!
//! let mut data = b"P6\n# from decoder\n2 1\n255\n".to_vec();
//! data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
//!
//! let mut stream = Cursor::new(data);
//! let rgb = read_ppm_frame(&mut stream, 2, 1).unwrap();
//! assert_eq!(rgb, Some(vec![1, 2, 3, 4, 5, 6]));
//! ```

use std::io::{self, BufRead, Read};

use tracing::debug;

/// Only maxval accepted; one byte per channel
const MAXVAL: u32 = 255;

/// Read the next `width` x `height` P6 image from `reader`
///
/// Returns the raw RGB24 payload (`width * height * 3` bytes). See the
/// module docs for when `Ok(None)` is returned. When a header announces a
/// different size, that image's payload is skipped so the stream stays
/// aligned on the following image (or at end of stream if it was cut short).
pub fn read_ppm_frame<R: BufRead>(
    reader: &mut R,
    width: usize,
    height: usize,
) -> io::Result<Option<Vec<u8>>> {
    if !seek_magic(reader)? {
        return Ok(None);
    }

    let (Some(w_tok), Some(h_tok), Some(max_tok)) = (
        read_token(reader)?,
        read_token(reader)?,
        read_token(reader)?,
    ) else {
        return Ok(None);
    };

    let (Ok(w), Ok(h), Ok(maxval)) = (
        w_tok.parse::<u64>(),
        h_tok.parse::<u64>(),
        max_tok.parse::<u32>(),
    ) else {
        debug!("Unparseable PPM header: {} {} {}", w_tok, h_tok, max_tok);
        return Ok(None);
    };

    if w != width as u64 || h != height as u64 || maxval != MAXVAL {
        debug!(
            "Skipping PPM frame {}x{} maxval {} (expected {}x{} maxval {})",
            w, h, maxval, width, height, MAXVAL
        );
        let payload = w.saturating_mul(h).saturating_mul(3);
        io::copy(&mut reader.by_ref().take(payload), &mut io::sink())?;
        return Ok(None);
    }

    let mut rgb = vec![0u8; width * height * 3];
    let filled = read_full(reader, &mut rgb)?;
    if filled < rgb.len() {
        debug!("PPM payload cut short: {} of {} bytes", filled, rgb.len());
        return Ok(None);
    }
    Ok(Some(rgb))
}

/// Fill `buf` as far as the stream allows, returning the byte count
///
/// Unlike `read_exact`, a short stream is not an error.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut off = 0;
    while off < buf.len() {
        match reader.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(off)
}

fn next_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = peek_byte(reader)?;
    if byte.is_some() {
        reader.consume(1);
    }
    Ok(byte)
}

fn peek_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok(buf) => return Ok(buf.first().copied()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn is_space(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0x0b
}

/// Advance past the next `P6` marker
fn seek_magic<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut prev = None;
    while let Some(byte) = next_byte(reader)? {
        if prev == Some(b'P') && byte == b'6' {
            return Ok(true);
        }
        prev = Some(byte);
    }
    Ok(false)
}

/// Next header token, skipping whitespace and `#` comments
///
/// Consumes the single whitespace byte that ends the token, which for the
/// maxval token is the separator before the binary payload.
fn read_token<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    loop {
        match peek_byte(reader)? {
            None => return Ok(None),
            Some(b) if is_space(b) => reader.consume(1),
            Some(b'#') => {
                while let Some(b) = next_byte(reader)? {
                    if b == b'\n' {
                        break;
                    }
                }
            }
            Some(_) => break,
        }
    }

    let mut token = String::new();
    while let Some(byte) = next_byte(reader)? {
        if is_space(byte) {
            break;
        }
        token.push(char::from(byte));
    }
    Ok(if token.is_empty() { None } else { Some(token) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ppm(width: usize, height: usize, maxval: u32, fill: u8) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n{}\n", width, height, maxval).into_bytes();
        out.extend(std::iter::repeat(fill).take(width * height * 3));
        out
    }

    #[test]
    fn test_reads_matching_frame() {
        let mut stream = Cursor::new(ppm(4, 2, 255, 7));
        let rgb = read_ppm_frame(&mut stream, 4, 2).expect("io").expect("frame");
        assert_eq!(rgb.len(), 4 * 2 * 3);
        assert!(rgb.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_consecutive_frames() {
        let mut data = ppm(2, 2, 255, 1);
        data.extend(ppm(2, 2, 255, 2));
        let mut stream = Cursor::new(data);

        let first = read_ppm_frame(&mut stream, 2, 2).expect("io").expect("first");
        let second = read_ppm_frame(&mut stream, 2, 2).expect("io").expect("second");
        assert_eq!(first[0], 1);
        assert_eq!(second[0], 2);
        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
    }

    #[test]
    fn test_header_comments_and_garbage() {
        let mut data = b"junk bytes before\nP6 # comment one\n# comment two\n 2\t1 255\n".to_vec();
        data.extend_from_slice(&[9, 8, 7, 6, 5, 4]);
        let mut stream = Cursor::new(data);

        let rgb = read_ppm_frame(&mut stream, 2, 1).expect("io");
        assert_eq!(rgb, Some(vec![9, 8, 7, 6, 5, 4]));
    }

    #[test]
    fn test_size_mismatch_skips_payload() {
        let mut data = ppm(3, 3, 255, 1);
        data.extend(ppm(2, 2, 255, 5));
        let mut stream = Cursor::new(data);

        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
        // Positioned right after the mismatched payload
        assert_eq!(stream.position() as usize, ppm(3, 3, 255, 1).len());

        let rgb = read_ppm_frame(&mut stream, 2, 2).expect("io").expect("frame");
        assert!(rgb.iter().all(|&b| b == 5));
    }

    #[test]
    fn test_wrong_maxval_rejected() {
        let mut data = ppm(2, 2, 65535, 1);
        data.extend(ppm(2, 2, 255, 3));
        let mut stream = Cursor::new(data);

        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
        assert!(read_ppm_frame(&mut stream, 2, 2).expect("io").is_some());
    }

    #[test]
    fn test_truncated_mismatch_ends_at_eof() {
        let mut data = ppm(8, 8, 255, 1);
        data.truncate(40);
        let len = data.len();
        let mut stream = Cursor::new(data);

        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
        assert_eq!(stream.position() as usize, len);
    }

    #[test]
    fn test_short_payload_is_failure() {
        let mut data = ppm(2, 2, 255, 1);
        data.truncate(data.len() - 1);
        let mut stream = Cursor::new(data);
        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
    }

    #[test]
    fn test_bad_header_tokens() {
        let mut stream = Cursor::new(b"P6\nabc 2\n255\n".to_vec());
        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);

        let mut stream = Cursor::new(b"P6\n2".to_vec());
        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);

        let mut stream = Cursor::new(Vec::new());
        assert_eq!(read_ppm_frame(&mut stream, 2, 2).expect("io"), None);
    }
}
