//! Optimization configuration.

use bitflags::bitflags;

bitflags! {
    /// Optimizations the caller enables for one compile.
    ///
    /// Every flag is independent. `NO_SAFETY_CHECKS` is not an
    /// optimization pass: it removes the runtime bounds guards from index
    /// expressions.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct OptimizationFlags: u32 {
        const CONSTANT_FOLDING = 1 << 0;
        const DEAD_CODE_ELIMINATION = 1 << 1;
        const BINARY_OP_OPTIMIZATION = 1 << 2;
        const LOOP_OPTIMIZATION = 1 << 3;
        const INLINING = 1 << 4;
        /// Accepted and ignored.
        const AUTO_VECTORISATION = 1 << 5;
        /// Accepted and ignored.
        const SMALL_OBJECT_OPTIMISATION = 1 << 6;
        /// Accepted and ignored.
        const ASM_OPTIMISATION = 1 << 7;
        const NO_SAFETY_CHECKS = 1 << 8;
    }
}

impl Default for OptimizationFlags {
    /// Everything except `NO_SAFETY_CHECKS`.
    fn default() -> Self {
        OptimizationFlags::all() - OptimizationFlags::NO_SAFETY_CHECKS
    }
}

/// Identifier strings accepted by [`OptimizationFlags::from_id`].
const IDS: &[(&str, OptimizationFlags)] = &[
    ("ConstantFolding", OptimizationFlags::CONSTANT_FOLDING),
    ("DeadCodeElimination", OptimizationFlags::DEAD_CODE_ELIMINATION),
    ("BinaryOpOptimisation", OptimizationFlags::BINARY_OP_OPTIMIZATION),
    ("LoopOptimisation", OptimizationFlags::LOOP_OPTIMIZATION),
    ("Inlining", OptimizationFlags::INLINING),
    ("AutoVectorisation", OptimizationFlags::AUTO_VECTORISATION),
    (
        "SmallObjectOptimisation",
        OptimizationFlags::SMALL_OBJECT_OPTIMISATION,
    ),
    ("AsmOptimisation", OptimizationFlags::ASM_OPTIMISATION),
    ("NoSafeChecks", OptimizationFlags::NO_SAFETY_CHECKS),
];

impl OptimizationFlags {
    /// Parse one identifier such as `"ConstantFolding"`.
    pub fn from_id(id: &str) -> Option<Self> {
        IDS.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(id.trim()))
            .map(|(_, flag)| *flag)
    }

    /// Parse a comma separated list of identifiers. Returns the first
    /// unknown identifier on failure.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut flags = OptimizationFlags::empty();
        for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            flags |= Self::from_id(id).ok_or_else(|| id.to_owned())?;
        }
        Ok(flags)
    }

    /// Identifier strings of the set flags, in declaration order.
    pub fn ids(self) -> Vec<&'static str> {
        IDS.iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Whether index expressions carry a bounds guard.
    pub fn safety_checks(self) -> bool {
        !self.contains(OptimizationFlags::NO_SAFETY_CHECKS)
    }
}

/// Default for [`AnalysisOptions::max_inline_statements`].
pub const DEFAULT_MAX_INLINE_STATEMENTS: usize = 8;

/// Options consumed by the analyzer and the optimization pipeline.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct AnalysisOptions {
    pub optimizations: OptimizationFlags,
    /// Largest callee body, in statements, considered for inlining.
    pub max_inline_statements: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            optimizations: OptimizationFlags::default(),
            max_inline_statements: DEFAULT_MAX_INLINE_STATEMENTS,
        }
    }
}

impl AnalysisOptions {
    pub fn with_optimizations(mut self, optimizations: OptimizationFlags) -> Self {
        self.optimizations = optimizations;
        self
    }

    pub fn with_max_inline_statements(mut self, max: usize) -> Self {
        self.max_inline_statements = max;
        self
    }
}
