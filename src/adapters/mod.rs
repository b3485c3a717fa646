//! External system integrations.
//!
//! - [`sunat`] - SOAP `billService` transport
//!
//! The pipeline only sees the [`sunat::BillService`] trait, so tests can
//! replace the HTTP client with an in-process implementation.

pub mod sunat;
