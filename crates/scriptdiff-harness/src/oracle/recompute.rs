//! Reference by recomputation: call the verifier a second time.

use scriptdiff_core::{Variant, Verifier, VerifyRequest, encode_hex};

use super::{FixtureRef, Oracle, OracleError, OracleResponse};

/// Renders a fresh verifier result in the same hex-line form an external
/// oracle would send, so both paths share one decode/compare contract.
pub struct RecomputeOracle<V> {
    verifier: V,
    variant: Variant,
}

impl<V: Verifier> RecomputeOracle<V> {
    pub fn new(verifier: V, variant: Variant) -> Self {
        Self { verifier, variant }
    }
}

impl<V: Verifier> Oracle for RecomputeOracle<V> {
    fn query(&mut self, fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError> {
        let request = VerifyRequest::from_record(fixture.record);
        let result = self.verifier.verify(self.variant, &request)?;
        let mut raw = encode_hex(&result.result_bytes()).into_bytes();
        raw.push(b'\n');
        Ok(OracleResponse {
            raw,
            truncated: false,
        })
    }

    fn label(&self) -> String {
        format!("recompute:{}", self.verifier.label())
    }
}
