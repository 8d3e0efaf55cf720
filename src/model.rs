//! Adaptive order-16 bit model
//!
//! One probability per context, where the context is the last `ORDER` coded
//! bits. Probabilities are fixed-point fractions of `SCALE` and always stay
//! strictly inside `(0, SCALE)`.

/// Number of previous bits forming the context
pub const ORDER: u32 = 16;
/// Number of distinct contexts
pub const CONTEXT_SIZE: usize = 1 << ORDER;
const CONTEXT_MASK: u32 = (1 << ORDER) - 1;

/// Fixed-point precision of stored probabilities
pub const SCALE_BITS: u32 = 14;
/// Probability denominator
pub const SCALE: u32 = 1 << SCALE_BITS;

/// Adaptation speed of the exponential moving average (decay 1/64)
const ADAPT_SHIFT: u32 = 6;

/// Per-context probability of the next bit being zero
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    /// P(bit = 0 | context), scaled by `SCALE`
    probabilities: Vec<u16>,
    /// Rolling window of the last `ORDER` bits
    context: u32,
}

impl ProbabilityModel {
    /// Create a model with every context at the uninformative prior
    pub fn new() -> Self {
        Self {
            probabilities: vec![(SCALE / 2) as u16; CONTEXT_SIZE],
            context: 0,
        }
    }

    /// Reset every context to `SCALE / 2` and clear the context register
    pub fn reset(&mut self) {
        self.probabilities.fill((SCALE / 2) as u16);
        self.context = 0;
    }

    /// Current context register
    #[inline(always)]
    pub fn context(&self) -> u32 {
        self.context
    }

    /// Probability of zero stored for `context`
    #[inline(always)]
    pub fn probability_of_zero(&self, context: u32) -> u32 {
        self.probabilities[(context & CONTEXT_MASK) as usize] as u32
    }

    /// Probability of zero at the current context
    #[inline(always)]
    pub fn p0(&self) -> u32 {
        let p = self.probability_of_zero(self.context);
        assert!(
            p > 0 && p < SCALE,
            "model invariant violated: p0={} at context {:#06x}",
            p,
            self.context
        );
        p
    }

    /// Move the current context's estimate toward `bit`, then shift `bit`
    /// into the context.
    #[inline(always)]
    pub fn update(&mut self, bit: u32) {
        let slot = &mut self.probabilities[self.context as usize];
        let p = *slot as u32;
        let updated = if bit == 0 {
            p + ((SCALE - p) >> ADAPT_SHIFT)
        } else {
            p - (p >> ADAPT_SHIFT)
        };
        *slot = updated as u16;
        self.context = ((self.context << 1) | (bit & 1)) & CONTEXT_MASK;
    }

    /// Iterate over every stored probability
    pub fn probabilities(&self) -> impl Iterator<Item = u32> + '_ {
        self.probabilities.iter().map(|&p| p as u32)
    }
}

impl Default for ProbabilityModel {
    fn default() -> Self {
        Self::new()
    }
}
