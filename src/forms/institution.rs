//! Institution intake wizard

use crate::core::values::{FieldValue, FormValues};
use crate::schema::{
    CrossFieldRule, DefinitionError, FieldSchema, FieldSpec, Format, StepDefinition, StepTable,
    WizardDefinition,
};

pub const ID: &str = "institution-intake";

crate::field_registry! {
    /// Fields of the institution intake form
    pub enum InstitutionField {
        InstitutionName => "institutionName",
        InstitutionType => "institutionType",
        TaxId => "taxId",
        NpiNumber => "npiNumber",
        Website => "website",
        ContractStartDate => "contractStartDate",
        ContractEndDate => "contractEndDate",
        PrimaryContactName => "primaryContactName",
        PrimaryContactTitle => "primaryContactTitle",
        PrimaryContactPhone => "primaryContactPhone",
        PrimaryContactEmail => "primaryContactEmail",
        BillingSameAsPrimary => "billingSameAsPrimary",
        BillingContactName => "billingContactName",
        BillingContactPhone => "billingContactPhone",
        BillingContactEmail => "billingContactEmail",
        Address => "address",
        City => "city",
        State => "state",
        ZipCode => "zipCode",
        Location => "location",
        LoadingNotes => "loadingNotes",
        Services => "services",
        ServiceRates => "serviceRates",
        PaymentTerms => "paymentTerms",
        ContractDocument => "contractDocument",
        Notes => "notes",
    }
}

use InstitutionField::*;

const SERVICES: &[&str] = &["ambulatory", "wheelchair", "stretcher", "bls", "als", "bariatric"];

fn schema() -> FieldSchema<InstitutionField> {
    FieldSchema::new()
        .field(InstitutionName, FieldSpec::text("Institution Name").required().min_len(2))
        .field(
            InstitutionType,
            FieldSpec::choice(
                "Institution Type",
                &["hospital", "nursing-home", "dialysis-center", "clinic", "rehabilitation", "other"],
            )
            .required(),
        )
        .field(TaxId, FieldSpec::text("Tax ID").format(Format::TaxId))
        .field(
            NpiNumber,
            FieldSpec::text("NPI Number").custom("NPI Number must be 10 digits", |v| {
                v.as_str()
                    .is_some_and(|s| s.len() == 10 && s.chars().all(|c| c.is_ascii_digit()))
            }),
        )
        .field(Website, FieldSpec::text("Website"))
        .field(ContractStartDate, FieldSpec::date("Contract Start Date").required())
        .field(ContractEndDate, FieldSpec::date("Contract End Date"))
        .field(
            PrimaryContactName,
            FieldSpec::text("Primary Contact Name").required().format(Format::AlphaName),
        )
        .field(PrimaryContactTitle, FieldSpec::text("Primary Contact Title"))
        .field(
            PrimaryContactPhone,
            FieldSpec::text("Primary Contact Phone").required().format(Format::Phone),
        )
        .field(
            PrimaryContactEmail,
            FieldSpec::text("Primary Contact Email").required().format(Format::Email),
        )
        .field(
            BillingSameAsPrimary,
            FieldSpec::boolean("Billing Contact Same as Primary").default_value(true),
        )
        .field(
            BillingContactName,
            FieldSpec::text("Billing Contact Name").format(Format::AlphaName),
        )
        .field(BillingContactPhone, FieldSpec::text("Billing Contact Phone").format(Format::Phone))
        .field(BillingContactEmail, FieldSpec::text("Billing Contact Email").format(Format::Email))
        .field(Address, FieldSpec::text("Street Address").required())
        .field(City, FieldSpec::text("City").required())
        .field(State, FieldSpec::text("State").required().format(Format::StateCode))
        .field(ZipCode, FieldSpec::text("ZIP Code").required().format(Format::ZipCode))
        .field(
            Location,
            FieldSpec::location("Map Location").help("Pick the main entrance on the map"),
        )
        .field(LoadingNotes, FieldSpec::long_text("Loading / Entrance Notes"))
        .field(
            Services,
            FieldSpec::multi_choice("Services", SERVICES).required().min_items(1),
        )
        .field(
            ServiceRates,
            FieldSpec::object("Service Configuration")
                .help("Per service: {rate, confirmed}"),
        )
        .field(
            PaymentTerms,
            FieldSpec::choice("Payment Terms", &["net-15", "net-30", "net-45"])
                .default_value("net-30"),
        )
        .field(ContractDocument, FieldSpec::attachment("Signed Contract"))
        .field(Notes, FieldSpec::long_text("Notes"))
}

fn steps() -> StepTable<InstitutionField> {
    StepTable::new(vec![
        StepDefinition::new(
            "basic",
            "Basic Information",
            vec![
                InstitutionName,
                InstitutionType,
                TaxId,
                NpiNumber,
                Website,
                ContractStartDate,
                ContractEndDate,
            ],
        ),
        StepDefinition::new(
            "contacts",
            "Contacts",
            vec![
                PrimaryContactName,
                PrimaryContactTitle,
                PrimaryContactPhone,
                PrimaryContactEmail,
                BillingSameAsPrimary,
                BillingContactName,
                BillingContactPhone,
                BillingContactEmail,
            ],
        ),
        StepDefinition::new(
            "location",
            "Location",
            vec![Address, City, State, ZipCode, Location, LoadingNotes],
        ),
        StepDefinition::new(
            "services",
            "Services & Rates",
            vec![Services, ServiceRates, PaymentTerms, ContractDocument, Notes],
        ),
    ])
}

/// True when the rate card entry for `service` is marked confirmed
fn rate_confirmed(rates: &FieldValue, service: &str) -> bool {
    rates
        .as_object()
        .and_then(|map| map.get(service))
        .and_then(FieldValue::as_object)
        .and_then(|entry| entry.get("confirmed"))
        .is_some_and(FieldValue::is_yes)
}

fn rules() -> Vec<CrossFieldRule<InstitutionField>> {
    let separate_billing = |v: &FormValues<InstitutionField>| !v.is_yes(BillingSameAsPrimary);

    vec![
        CrossFieldRule::required_when(
            "billing-name",
            vec![BillingSameAsPrimary],
            BillingContactName,
            "Billing contact name is required unless billing uses the primary contact",
            separate_billing,
        ),
        CrossFieldRule::required_when(
            "billing-phone",
            vec![BillingSameAsPrimary],
            BillingContactPhone,
            "Billing contact phone is required unless billing uses the primary contact",
            separate_billing,
        ),
        CrossFieldRule::date_order(
            "contract-dates",
            ContractStartDate,
            ContractEndDate,
            "Contract end date must be on or after the start date",
        ),
        // One summary error on the configuration, not one per service
        CrossFieldRule::new(
            "rate-card",
            vec![Services, ServiceRates],
            "At least one selected service needs a confirmed rate",
            ServiceRates,
            |v| {
                let selected = v.selections(Services);
                selected.is_empty()
                    || selected
                        .iter()
                        .any(|s| rate_confirmed(v.get(ServiceRates), s))
            },
        ),
    ]
}

pub fn definition() -> Result<WizardDefinition<InstitutionField>, DefinitionError> {
    WizardDefinition::new(ID, "Institution Intake", schema(), steps(), rules())
}
