//! Domain models: sqlx row structs, status enums, and repository inputs.

pub mod availability;
pub mod booking;
pub mod contact;
pub mod contract;
pub mod invoice;
pub mod payment;
pub mod payment_plan;
pub mod portal;
pub mod webhook;

pub use availability::{
    AvailabilityOverride, AvailabilityRule, CreateAvailabilityOverride, CreateAvailabilityRule,
};
pub use booking::{
    Booking, BookingStatus, BookingType, CreateBooking, CreateBookingType, ListBookingsFilter,
    UpdateBookingType,
};
pub use contact::{Contact, CreateContact, ListContactsFilter, UpdateContact};
pub use contract::{
    AuditActor, Contract, ContractStatus, ContractTemplate, CreateContract,
    CreateContractTemplate, SignatureAuditLog,
};
pub use invoice::{
    CreateInvoice, CreateLineItem, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter,
};
pub use payment::{CreatePayment, Payment};
pub use payment_plan::{
    CreatePaymentPlan, Installment, InstallmentStatus, PaymentPlan, PlanFrequency, PlanStatus,
};
pub use portal::{PortalLoginToken, PortalSession};
pub use webhook::WebhookEvent;
