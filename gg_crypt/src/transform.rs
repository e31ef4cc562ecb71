use std::io::{self, Read, Write};

/// A stateful byte-stream transformation.
///
/// Implementations mutate `data` in place; internal state (cursor, running
/// sums) advances by `data.len()` bytes, so transforming two consecutive
/// chunks is equivalent to transforming their concatenation in one call.
pub trait Transformer {
    fn transform(&mut self, data: &mut [u8]);
}

/// Reader adapter that applies a transformer to every byte read from the
/// underlying source.
pub struct TransformReader<R, T> {
    inner: R,
    transformer: T,
}

impl<R: Read, T: Transformer> TransformReader<R, T> {
    pub fn new(inner: R, transformer: T) -> Self {
        TransformReader { inner, transformer }
    }
}

impl<R: Read, T: Transformer> Read for TransformReader<R, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.transformer.transform(&mut buf[..n]);
        Ok(n)
    }
}

/// Writer adapter that transforms bytes before forwarding them to the
/// underlying sink.
pub struct TransformWriter<W, T> {
    inner: W,
    transformer: T,
}

impl<W: Write, T: Transformer> TransformWriter<W, T> {
    pub fn new(inner: W, transformer: T) -> Self {
        TransformWriter { inner, transformer }
    }
}

impl<W: Write, T: Transformer> Write for TransformWriter<W, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut transformed = buf.to_vec();
        self.transformer.transform(&mut transformed);
        // The transformer state has already advanced over the whole chunk,
        // so a partial write must not be reported back to the caller.
        self.inner.write_all(&transformed)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
