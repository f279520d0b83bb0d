//! Signing and verification capabilities.
//!
//! Events never talk to a wallet library directly. A [`Signer`] produces
//! typed-data signatures and a [`Verifier`] checks them, so any ECDSA backend
//! can be plugged in without touching chain logic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::typed_data::TypedData;

/// Boxed error returned by capability implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Produces typed-data signatures for one account.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The account address, `0x`-prefixed.
    async fn address(&self) -> Result<String, BoxError>;

    /// Sign typed data, returning the signature as `0x`-prefixed hex.
    async fn sign_typed_data(&self, data: &TypedData) -> Result<String, BoxError>;
}

/// Checks whether `signature` over `data` was produced by `address`.
///
/// `data` may contain binary fields; implementations normalize them to the
/// representation their crypto library expects.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        address: &str,
        data: &TypedData,
        signature: &str,
    ) -> Result<bool, BoxError>;
}

#[async_trait]
impl<T: Verifier + ?Sized> Verifier for Arc<T> {
    async fn verify(
        &self,
        address: &str,
        data: &TypedData,
        signature: &str,
    ) -> Result<bool, BoxError> {
        (**self).verify(address, data, signature).await
    }
}

#[async_trait]
impl<T: Signer + ?Sized> Signer for Arc<T> {
    async fn address(&self) -> Result<String, BoxError> {
        (**self).address().await
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<String, BoxError> {
        (**self).sign_typed_data(data).await
    }
}

/// A [`Verifier`] backed by a plain function.
#[derive(Clone)]
pub struct VerifyFn<F> {
    f: F,
}

/// Wrap a synchronous function as a [`Verifier`].
pub fn verify_fn<F>(f: F) -> VerifyFn<F>
where
    F: Fn(&str, &TypedData, &str) -> Result<bool, BoxError> + Send + Sync,
{
    VerifyFn { f }
}

#[async_trait]
impl<F> Verifier for VerifyFn<F>
where
    F: Fn(&str, &TypedData, &str) -> Result<bool, BoxError> + Send + Sync,
{
    async fn verify(
        &self,
        address: &str,
        data: &TypedData,
        signature: &str,
    ) -> Result<bool, BoxError> {
        (self.f)(address, data, signature)
    }
}

impl<F> std::fmt::Debug for VerifyFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VerifyFn")
    }
}
