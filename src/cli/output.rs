pub use cife_core::format::OutputFormat;
