//! Deal and commission math. Pure and deterministic: same inputs, same
//! outputs, no hidden state anywhere.

use serde::{Deserialize, Serialize};

use leadgate_protocol::defaults;

/// Financial line items of a proposed deal. Ephemeral - computed on demand,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealSheet {
    pub ex_showroom: i64,
    pub discount: i64,
    pub insurance: i64,
    pub accessories: i64,
}

/// Net customer price for a deal sheet.
pub fn net_price(deal: &DealSheet) -> i64 {
    deal.ex_showroom - deal.discount + deal.insurance + deal.accessories
}

/// Finance-linked commission, gross to net.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub gross: f64,
    pub tax: f64,
    pub net: f64,
}

/// Commission on a financed amount: base plus top-up, less tax.
pub fn finance_commission(loan_amount: i64, base_rate: f64, top_up_rate: f64) -> CommissionBreakdown {
    let loan = loan_amount as f64;
    let gross = loan * base_rate + loan * top_up_rate;
    let tax = gross * defaults::COMMISSION_TAX_RATE;
    CommissionBreakdown {
        gross,
        tax,
        net: gross - tax,
    }
}

/// Commission estimate for a finance-linked journey at the standard rates.
pub fn structure_deal(loan_amount: i64) -> CommissionBreakdown {
    finance_commission(
        loan_amount,
        defaults::FINANCE_BASE_RATE,
        defaults::FINANCE_TOP_UP_RATE,
    )
}

/// A proforma quote being assembled for a deal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProformaQuote {
    pub discount: Option<i64>,
    pub loan_amount: Option<i64>,
    pub processing_fee: Option<i64>,
}

/// Which proforma fields are still missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProformaCheck {
    pub missing: Vec<&'static str>,
}

impl ProformaCheck {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Report the fields a quote still needs before it can go out.
pub fn validate_proforma(quote: &ProformaQuote) -> ProformaCheck {
    let mut missing = Vec::new();
    if quote.discount.is_none() {
        missing.push("discount");
    }
    if quote.loan_amount.is_none() {
        missing.push("loan_amount");
    }
    if quote.processing_fee.is_none() {
        missing.push("processing_fee");
    }
    ProformaCheck { missing }
}
