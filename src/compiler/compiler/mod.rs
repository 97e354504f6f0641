pub mod filter_compiler;

pub use filter_compiler::FilterCompiler;
