/// The current application version of Copilot FX.
pub const VERSION: &str = "0.1.0";

pub mod core;

#[cfg(feature = "testing")]
pub mod testing {
    use crate::core::metrics::{self, MetricsProvider};

    use async_trait::async_trait;
    use log::LevelFilter;
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Logger, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use log4rs::Config;
    use mockall::mock;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Initializes the logger with the specified log level.
    #[macro_export]
    macro_rules! init_logger {
        ($level:expr) => {
            copilot_fx_core::testing::init_logger_level($level)
        };
        () => {
            copilot_fx_core::testing::init_logger_level(log::LevelFilter::Trace)
        };
    }

    /// Initializes the logger with the specified log level.
    pub fn init_logger_level(level: LevelFilter) {
        INIT.call_once(|| {
            log4rs::init_config(Config::builder()
                .appender(Appender::builder().build("stdout", Box::new(ConsoleAppender::builder()
                    .encoder(Box::new(PatternEncoder::new("\x1B[37m{d(%Y-%m-%d %H:%M:%S%.3f)}\x1B[0m {h({l:>5.5})} \x1B[35m{I:>6.6}\x1B[0m \x1B[37m---\x1B[0m \x1B[37m[{T:>15.15}]\x1B[0m \x1B[36m{t:<60.60}\x1B[0m \x1B[37m:\x1B[0m {m}{n}")))
                    .build())))
                .logger(Logger::builder().build("httpmock::server", LevelFilter::Debug))
                .logger(Logger::builder().build("hyper", LevelFilter::Info))
                .logger(Logger::builder().build("hyper_util", LevelFilter::Info))
                .logger(Logger::builder().build("mio", LevelFilter::Info))
                .logger(Logger::builder().build("reqwest", LevelFilter::Info))
                .logger(Logger::builder().build("tracing", LevelFilter::Info))
                .logger(Logger::builder().build("want", LevelFilter::Info))
                .build(Root::builder().appender("stdout").build(level))
                .unwrap())
                .unwrap();
        })
    }

    /// Write the given contents to a file within the temp directory.
    ///
    /// It returns the path to the created file.
    pub fn write_test_file(directory: &Path, filename: &str, contents: &str) -> PathBuf {
        let path = directory.join(filename);
        fs::write(&path, contents).expect("expected the test file to have been written");
        path
    }

    /// Read the given file within the temp directory as a string.
    pub fn read_test_file(directory: &Path, filename: &str) -> String {
        fs::read_to_string(directory.join(filename))
            .expect("expected the test file to have been read")
    }

    mock! {
        #[derive(Debug)]
        pub MetricsProvider {}

        #[async_trait]
        impl MetricsProvider for MetricsProvider {
            async fn fetch(&self) -> metrics::Result<PathBuf>;
        }
    }
}
