use std::io::{self, BufWriter, Write};

use crate::pipeline::Item;

/// Destination for factored items, driven by the consumer thread.
pub trait FactorSink: Send {
    /// Called once before the first item.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn emit(&mut self, item: &Item) -> io::Result<()>;

    /// Called once after the last item.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects items in memory.
impl FactorSink for Vec<Item> {
    fn emit(&mut self, item: &Item) -> io::Result<()> {
        self.push(item.clone());
        Ok(())
    }
}

/// Line-oriented text output:
///
/// ```text
/// Prime Factors:
///     100: 2 2 5 5
/// ```
pub struct TextSink<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Flush and return the underlying writer.
    #[cfg(test)]
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl TextSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> FactorSink for TextSink<W> {
    fn begin(&mut self) -> io::Result<()> {
        self.writer.write_all(b"Prime Factors:\n")
    }

    fn emit(&mut self, item: &Item) -> io::Result<()> {
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(item.value).as_bytes())?;
        self.writer.write_all(b":")?;

        for &factor in &item.factors {
            self.writer.write_all(b" ")?;
            self.writer
                .write_all(self.itoa_buf.format(factor).as_bytes())?;
        }

        self.writer.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sink_format() {
        let mut sink = TextSink::new(Vec::new());
        sink.begin().unwrap();
        sink.emit(&Item::new(100, vec![2, 2, 5, 5])).unwrap();
        sink.emit(&Item::new(17, vec![17])).unwrap();
        sink.finish().unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "Prime Factors:\n\t100: 2 2 5 5\n\t17: 17\n");
    }

    #[test]
    fn test_text_sink_header_only() {
        let mut sink = TextSink::new(Vec::new());
        sink.begin().unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.into_inner().unwrap(), b"Prime Factors:\n");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<Item> = Vec::new();
        sink.emit(&Item::new(4, vec![2, 2])).unwrap();
        assert_eq!(sink, vec![Item::new(4, vec![2, 2])]);
    }
}
