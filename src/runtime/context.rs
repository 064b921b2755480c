use std::io::Write;

/// Execution context of a single program run. It owns the sink that `print`
/// statements write into; all statements of a run share one context.
pub trait Context {
    fn output_stream(&mut self) -> &mut dyn Write;
}

/// Production context over an arbitrary writer, typically locked stdout.
pub struct SimpleContext<W: Write> {
    output: W,
}

impl<W: Write> SimpleContext<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> Context for SimpleContext<W> {
    fn output_stream(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

/// Captures program output in memory so tests can read it back.
#[derive(Default)]
pub struct BufferedContext {
    output: Vec<u8>,
}

impl BufferedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Context for BufferedContext {
    fn output_stream(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}
