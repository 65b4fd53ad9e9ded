pub trait Logger {
    fn log(&mut self, msg: &str);
}

impl<'a, T> Logger for &'a mut T
where
    T: Logger,
{
    fn log(&mut self, msg: &str) {
        T::log(self, msg);
    }
}

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {
        $crate::util::logging::Logger::log(&mut $logger, &format!($($arg)*))
    };
}

#[derive(Debug)]
pub struct PrintLogger {
    name: String,
}

impl PrintLogger {
    #[must_use]
    pub const fn new(name: String) -> PrintLogger {
        PrintLogger { name }
    }
}

impl Logger for PrintLogger {
    fn log(&mut self, msg: &str) {
        println!("[{}] {}", self.name, msg);
    }
}

#[derive(Debug, Default)]
pub struct NothingLogger;

impl Logger for NothingLogger {
    fn log(&mut self, _msg: &str) {}
}

/// Keeps every message in memory, mostly useful for asserting on log output.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    pub messages: Vec<String>,
}

impl Logger for RecordingLogger {
    fn log(&mut self, msg: &str) {
        self.messages.push(msg.to_owned());
    }
}
