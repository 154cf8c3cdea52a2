//! 编译模块：将原始规则编译为预计算的运行时规则
pub mod pattern;
pub mod compiler;

pub use self::pattern::{CompiledRule, CompiledRuleSet, SiteMatcher};
pub use self::compiler::RuleCompiler;
