//! LeadGate service facade.
//!
//! Wires the decision core to a store behind the operations the transport
//! layer consumes: identity resolution, gate classification, transitions,
//! calibration, policy checks and deal math. The facade owns the shared
//! calibration handle and serializes multi-step lead mutations; the engine
//! underneath stays pure.

pub mod driver;
pub mod service;

pub use driver::run_driver;
pub use service::{DashboardStats, DriveReport, GateCounts, QualificationService};

// Deal math is pure and store-free; surface it directly.
pub use leadgate_engine::{
    finance_commission, net_price, structure_deal, validate_proforma, CommissionBreakdown,
    DealSheet, ProformaCheck, ProformaQuote,
};
