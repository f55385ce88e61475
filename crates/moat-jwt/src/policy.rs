//! Token validation policy.
//!
//! A policy is an immutable composition built once and shared across
//! reads. Claim checks run in registration order after the payload is
//! decoded; the signature requirement is part of header validation and
//! runs first. The clock is injectable so lifetime tests don't race the
//! wall clock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use moat_jose::{Claims, Jwk, SignatureAlgorithm};

use crate::error::TokenError;
use crate::keys::KeyProvider;

/// Default cap on the raw token size: 16 KiB. Tokens larger than this
/// are rejected as malformed unless the policy raises the cap.
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 16 * 1024;

pub(crate) type ClockFn = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> ClockFn {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0)
    })
}

pub(crate) enum SignatureRequirement {
    /// Signatures are not checked (decode-only policies).
    None,
    /// Verify against exactly this key.
    Key(Jwk),
    /// Verify against whatever the provider yields for the header.
    Provider(Arc<dyn KeyProvider>),
}

pub(crate) enum KeySource {
    None,
    Key(Jwk),
    Provider(Arc<dyn KeyProvider>),
}

pub(crate) enum ClaimCheck {
    Issuer(String),
    Audience(Vec<String>),
    Lifetime { clock_skew: i64, require_exp: bool },
    Required(String),
}

/// Immutable validation policy; build with [`ValidationPolicy::builder`].
pub struct ValidationPolicy {
    pub(crate) signature: SignatureRequirement,
    pub(crate) allowed_algorithms: Option<HashSet<SignatureAlgorithm>>,
    pub(crate) checks: Vec<ClaimCheck>,
    pub(crate) decryption: KeySource,
    pub(crate) max_token_size: usize,
    pub(crate) ignore_nested: bool,
    pub(crate) clock: ClockFn,
}

impl ValidationPolicy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    pub fn max_token_size(&self) -> usize {
        self.max_token_size
    }

    /// Whether any signature or claim validator is registered. A policy
    /// without validation reads tokens for their content only.
    pub fn has_validation(&self) -> bool {
        !matches!(self.signature, SignatureRequirement::None) || !self.checks.is_empty()
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Header-stage check: the resolved signature algorithm must be in
    /// the allowed set, when one is configured.
    pub(crate) fn check_algorithm_allowed(
        &self,
        alg: SignatureAlgorithm,
    ) -> Result<(), TokenError> {
        match &self.allowed_algorithms {
            Some(allowed) if !allowed.contains(&alg) => Err(TokenError::InvalidHeader("alg")),
            _ => Ok(()),
        }
    }

    /// Claim-stage checks, in registration order.
    pub(crate) fn validate_claims(&self, claims: &Claims) -> Result<(), TokenError> {
        for check in &self.checks {
            match check {
                ClaimCheck::Issuer(expected) => {
                    if claims.iss.as_deref() != Some(expected.as_str()) {
                        return Err(TokenError::PolicyViolation("iss".into()));
                    }
                }
                ClaimCheck::Audience(allowed) => {
                    let matched = claims
                        .aud
                        .as_ref()
                        .map(|aud| allowed.iter().any(|allowed| aud.contains(allowed)))
                        .unwrap_or(false);
                    if !matched {
                        return Err(TokenError::PolicyViolation("aud".into()));
                    }
                }
                ClaimCheck::Lifetime {
                    clock_skew,
                    require_exp,
                } => {
                    let now = self.now();
                    match claims.exp {
                        Some(exp) => {
                            if now >= exp + clock_skew {
                                return Err(TokenError::PolicyViolation("exp".into()));
                            }
                        }
                        None => {
                            if *require_exp {
                                return Err(TokenError::PolicyViolation("exp".into()));
                            }
                        }
                    }
                    if let Some(nbf) = claims.nbf {
                        if now + clock_skew < nbf {
                            return Err(TokenError::PolicyViolation("nbf".into()));
                        }
                    }
                }
                ClaimCheck::Required(name) => {
                    if !claims.has_claim(name) {
                        return Err(TokenError::PolicyViolation(name.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`ValidationPolicy`].
pub struct PolicyBuilder {
    signature: SignatureRequirement,
    allowed_algorithms: Option<HashSet<SignatureAlgorithm>>,
    checks: Vec<ClaimCheck>,
    decryption: KeySource,
    max_token_size: usize,
    ignore_nested: bool,
    clock: ClockFn,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self {
            signature: SignatureRequirement::None,
            allowed_algorithms: None,
            checks: Vec::new(),
            decryption: KeySource::None,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
            ignore_nested: false,
            clock: system_clock(),
        }
    }

    /// Require a valid signature under exactly this key.
    pub fn require_signature(mut self, key: Jwk) -> Self {
        self.signature = SignatureRequirement::Key(key);
        self
    }

    /// Require a valid signature under a key the provider yields.
    pub fn require_signature_from(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.signature = SignatureRequirement::Provider(provider);
        self
    }

    /// Restrict acceptable signature algorithms. Tokens carrying any
    /// other `alg` fail header validation.
    pub fn allow_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = SignatureAlgorithm>,
    ) -> Self {
        self.allowed_algorithms
            .get_or_insert_with(HashSet::new)
            .extend(algorithms);
        self
    }

    pub fn require_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.checks.push(ClaimCheck::Issuer(issuer.into()));
        self
    }

    /// Require the `aud` claim to contain one of the allowed audiences.
    /// Repeated calls extend the same check.
    pub fn require_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into();
        let existing = self
            .checks
            .iter()
            .position(|check| matches!(check, ClaimCheck::Audience(_)));
        match existing {
            Some(index) => {
                if let ClaimCheck::Audience(allowed) = &mut self.checks[index] {
                    allowed.push(audience);
                }
            }
            None => self.checks.push(ClaimCheck::Audience(vec![audience])),
        }
        self
    }

    /// Require `exp`/`nbf` to admit the current time within
    /// `clock_skew_secs` of tolerance.
    pub fn require_lifetime(mut self, clock_skew_secs: u64, require_exp: bool) -> Self {
        self.checks.push(ClaimCheck::Lifetime {
            clock_skew: clock_skew_secs as i64,
            require_exp,
        });
        self
    }

    /// Require a claim to be present, by name.
    pub fn require_claim(mut self, name: impl Into<String>) -> Self {
        self.checks.push(ClaimCheck::Required(name.into()));
        self
    }

    /// Provide the decryption key for JWE tokens.
    pub fn decrypt_with(mut self, key: Jwk) -> Self {
        self.decryption = KeySource::Key(key);
        self
    }

    /// Provide decryption keys through a provider.
    pub fn decrypt_with_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.decryption = KeySource::Provider(provider);
        self
    }

    /// Cap the raw token size in bytes (default 16 KiB). Tokens larger
    /// than the cap are rejected before any parsing.
    pub fn max_token_size(mut self, bytes: usize) -> Self {
        self.max_token_size = bytes;
        self
    }

    /// Return decrypted JWE payloads verbatim instead of recursing into
    /// nested tokens.
    pub fn ignore_nested(mut self, ignore: bool) -> Self {
        self.ignore_nested = ignore;
        self
    }

    /// Inject a clock returning seconds since the Unix epoch.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> ValidationPolicy {
        ValidationPolicy {
            signature: self.signature,
            allowed_algorithms: self.allowed_algorithms,
            checks: self.checks,
            decryption: self.decryption,
            max_token_size: self.max_token_size,
            ignore_nested: self.ignore_nested,
            clock: self.clock,
        }
    }
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now: i64) -> impl Fn() -> i64 {
        move || now
    }

    #[test]
    fn empty_policy_has_no_validation() {
        let policy = ValidationPolicy::builder().build();
        assert!(!policy.has_validation());
        assert!(policy.validate_claims(&Claims::new()).is_ok());
    }

    #[test]
    fn issuer_check() {
        let policy = ValidationPolicy::builder().require_issuer("iss-1").build();
        assert!(policy.has_validation());
        assert!(policy
            .validate_claims(&Claims::new().with_issuer("iss-1"))
            .is_ok());
        let err = policy
            .validate_claims(&Claims::new().with_issuer("iss-2"))
            .unwrap_err();
        assert!(matches!(err, TokenError::PolicyViolation(claim) if claim == "iss"));
        assert!(policy.validate_claims(&Claims::new()).is_err());
    }

    #[test]
    fn audience_check_accepts_any_allowed() {
        let policy = ValidationPolicy::builder()
            .require_audience("api")
            .require_audience("web")
            .build();
        assert!(policy
            .validate_claims(&Claims::new().with_audience("web"))
            .is_ok());
        assert!(policy
            .validate_claims(&Claims::new().with_audience(vec!["other".into(), "api".into()]))
            .is_ok());
        assert!(policy
            .validate_claims(&Claims::new().with_audience("other"))
            .is_err());
        assert!(policy.validate_claims(&Claims::new()).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let policy = ValidationPolicy::builder()
            .require_lifetime(0, true)
            .with_clock(at(1000))
            .build();
        let err = policy
            .validate_claims(&Claims::new().with_expiry(999))
            .unwrap_err();
        assert!(matches!(err, TokenError::PolicyViolation(claim) if claim == "exp"));
    }

    #[test]
    fn clock_skew_admits_recently_expired() {
        let policy = ValidationPolicy::builder()
            .require_lifetime(5, true)
            .with_clock(at(1000))
            .build();
        // exp = now - 3 is inside the 5-second skew.
        assert!(policy
            .validate_claims(&Claims::new().with_expiry(997))
            .is_ok());
        // exp = now - 5 is not.
        assert!(policy
            .validate_claims(&Claims::new().with_expiry(995))
            .is_err());
    }

    #[test]
    fn missing_exp_honors_require_exp() {
        let strict = ValidationPolicy::builder()
            .require_lifetime(0, true)
            .with_clock(at(1000))
            .build();
        assert!(strict.validate_claims(&Claims::new()).is_err());

        let lax = ValidationPolicy::builder()
            .require_lifetime(0, false)
            .with_clock(at(1000))
            .build();
        assert!(lax.validate_claims(&Claims::new()).is_ok());
    }

    #[test]
    fn not_before_rejected_until_valid() {
        let policy = ValidationPolicy::builder()
            .require_lifetime(0, false)
            .with_clock(at(1000))
            .build();
        assert!(policy
            .validate_claims(&Claims::new().with_not_before(1001))
            .is_err());
        assert!(policy
            .validate_claims(&Claims::new().with_not_before(1000))
            .is_ok());
    }

    #[test]
    fn required_claim_check() {
        let policy = ValidationPolicy::builder().require_claim("scope").build();
        assert!(policy
            .validate_claims(&Claims::new().with_claim("scope", "read"))
            .is_ok());
        let err = policy.validate_claims(&Claims::new()).unwrap_err();
        assert!(matches!(err, TokenError::PolicyViolation(claim) if claim == "scope"));
    }

    #[test]
    fn checks_run_in_registration_order() {
        let policy = ValidationPolicy::builder()
            .require_claim("first")
            .require_issuer("iss-1")
            .build();
        // Both fail; the first registered check reports.
        let err = policy.validate_claims(&Claims::new()).unwrap_err();
        assert!(matches!(err, TokenError::PolicyViolation(claim) if claim == "first"));
    }

    #[test]
    fn algorithm_allow_list() {
        let policy = ValidationPolicy::builder()
            .allow_algorithms([SignatureAlgorithm::HS256])
            .build();
        assert!(policy
            .check_algorithm_allowed(SignatureAlgorithm::HS256)
            .is_ok());
        assert!(policy
            .check_algorithm_allowed(SignatureAlgorithm::RS256)
            .is_err());

        let open = ValidationPolicy::builder().build();
        assert!(open
            .check_algorithm_allowed(SignatureAlgorithm::RS256)
            .is_ok());
    }
}
