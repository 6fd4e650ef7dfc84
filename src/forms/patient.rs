//! Patient intake wizard

use crate::core::values::FormValues;
use crate::schema::{
    CrossFieldRule, DefinitionError, FieldSchema, FieldSpec, Format, StepDefinition, StepTable,
    WizardDefinition,
};

pub const ID: &str = "patient-intake";

crate::field_registry! {
    /// Fields of the patient intake form
    pub enum PatientField {
        // personal
        FirstName => "firstName",
        LastName => "lastName",
        DateOfBirth => "dateOfBirth",
        Gender => "gender",
        MedicalRecordNumber => "medicalRecordNumber",
        PreferredLanguage => "preferredLanguage",
        InterpreterRequired => "interpreterRequired",
        // medical
        PrimaryDiagnosis => "primaryDiagnosis",
        Allergies => "allergies",
        Medications => "medications",
        WeightLbs => "weightLbs",
        MobilityStatus => "mobilityStatus",
        OxygenRequired => "oxygenRequired",
        OxygenFlowRate => "oxygenFlowRate",
        IsolationPrecautions => "isolationPrecautions",
        // insurance
        InsuranceProvider => "insuranceProvider",
        PolicyNumber => "policyNumber",
        GroupNumber => "groupNumber",
        PriorAuthorization => "priorAuthorization",
        AuthorizationNumber => "authorizationNumber",
        AuthorizationStartDate => "authorizationStartDate",
        AuthorizationEndDate => "authorizationEndDate",
        InsuranceCard => "insuranceCard",
        // accessibility
        WheelchairType => "wheelchairType",
        Bariatric => "bariatric",
        HearingImpaired => "hearingImpaired",
        VisuallyImpaired => "visuallyImpaired",
        SpecialEquipment => "specialEquipment",
        // contact
        Phone => "phone",
        Email => "email",
        Address => "address",
        City => "city",
        State => "state",
        ZipCode => "zipCode",
        EmergencyContactName => "emergencyContactName",
        EmergencyContactPhone => "emergencyContactPhone",
        EmergencyContactRelationship => "emergencyContactRelationship",
        // notes
        AdditionalNotes => "additionalNotes",
        Documents => "documents",
    }
}

use PatientField::*;

const YES_NO: &[&str] = &["Yes", "No"];

fn schema() -> FieldSchema<PatientField> {
    FieldSchema::new()
        .field(FirstName, FieldSpec::text("First Name").required().format(Format::AlphaName).max_len(50))
        .field(LastName, FieldSpec::text("Last Name").required().format(Format::AlphaName).max_len(50))
        .field(
            DateOfBirth,
            FieldSpec::date("Date of Birth").required().not_future().age_between(0, 120),
        )
        .field(
            Gender,
            FieldSpec::choice("Gender", &["male", "female", "other", "prefer-not-to-say"]).required(),
        )
        .field(
            MedicalRecordNumber,
            FieldSpec::text("Medical Record Number").format(Format::RecordNumber),
        )
        .field(PreferredLanguage, FieldSpec::text("Preferred Language"))
        .field(
            InterpreterRequired,
            FieldSpec::choice("Interpreter Required", YES_NO).required().default_value("No"),
        )
        .field(PrimaryDiagnosis, FieldSpec::text("Primary Diagnosis").required())
        .field(Allergies, FieldSpec::long_text("Allergies"))
        .field(Medications, FieldSpec::long_text("Current Medications"))
        .field(WeightLbs, FieldSpec::number("Weight (lbs)").range(1.0, 1000.0))
        .field(
            MobilityStatus,
            FieldSpec::choice(
                "Mobility Status",
                &["ambulatory", "wheelchair", "stretcher", "bedbound"],
            )
            .required(),
        )
        .field(OxygenRequired, FieldSpec::boolean("Oxygen Required"))
        .field(OxygenFlowRate, FieldSpec::number("Oxygen Flow Rate (L/min)").range(0.5, 15.0))
        .field(
            IsolationPrecautions,
            FieldSpec::choice("Isolation Precautions", &["none", "contact", "droplet", "airborne"])
                .default_value("none"),
        )
        .field(InsuranceProvider, FieldSpec::text("Insurance Provider").required())
        .field(PolicyNumber, FieldSpec::text("Policy Number").required().min_len(4))
        .field(GroupNumber, FieldSpec::text("Group Number"))
        .field(
            PriorAuthorization,
            FieldSpec::choice("Prior Authorization", YES_NO).required().default_value("No"),
        )
        .field(AuthorizationNumber, FieldSpec::text("Authorization Number"))
        .field(AuthorizationStartDate, FieldSpec::date("Authorization Start Date"))
        .field(AuthorizationEndDate, FieldSpec::date("Authorization End Date"))
        .field(
            InsuranceCard,
            FieldSpec::attachment("Insurance Card").help("Front of the insurance card"),
        )
        .field(
            WheelchairType,
            FieldSpec::choice("Wheelchair Type", &["none", "manual", "power", "bariatric"])
                .default_value("none"),
        )
        .field(Bariatric, FieldSpec::boolean("Bariatric Transport"))
        .field(HearingImpaired, FieldSpec::boolean("Hearing Impaired"))
        .field(VisuallyImpaired, FieldSpec::boolean("Visually Impaired"))
        .field(
            SpecialEquipment,
            FieldSpec::multi_choice(
                "Special Equipment",
                &["oxygen", "stretcher", "lift", "car-seat", "cardiac-monitor"],
            ),
        )
        .field(Phone, FieldSpec::text("Phone").required().format(Format::Phone))
        .field(Email, FieldSpec::text("Email").format(Format::Email))
        .field(Address, FieldSpec::text("Street Address").required())
        .field(City, FieldSpec::text("City").required())
        .field(State, FieldSpec::text("State").required().format(Format::StateCode))
        .field(ZipCode, FieldSpec::text("ZIP Code").required().format(Format::ZipCode))
        .field(
            EmergencyContactName,
            FieldSpec::text("Emergency Contact Name").required().format(Format::AlphaName),
        )
        .field(
            EmergencyContactPhone,
            FieldSpec::text("Emergency Contact Phone").required().format(Format::Phone),
        )
        .field(EmergencyContactRelationship, FieldSpec::text("Relationship"))
        .field(AdditionalNotes, FieldSpec::long_text("Additional Notes").max_len(2000))
        .field(Documents, FieldSpec::attachments("Supporting Documents"))
}

fn steps() -> StepTable<PatientField> {
    StepTable::new(vec![
        StepDefinition::new(
            "personal",
            "Personal Information",
            vec![
                FirstName,
                LastName,
                DateOfBirth,
                Gender,
                MedicalRecordNumber,
                PreferredLanguage,
                InterpreterRequired,
            ],
        ),
        StepDefinition::new(
            "medical",
            "Medical Information",
            vec![
                PrimaryDiagnosis,
                Allergies,
                Medications,
                WeightLbs,
                MobilityStatus,
                OxygenRequired,
                OxygenFlowRate,
                IsolationPrecautions,
            ],
        ),
        StepDefinition::new(
            "insurance",
            "Insurance",
            vec![
                InsuranceProvider,
                PolicyNumber,
                GroupNumber,
                PriorAuthorization,
                AuthorizationNumber,
                AuthorizationStartDate,
                AuthorizationEndDate,
                InsuranceCard,
            ],
        ),
        StepDefinition::new(
            "accessibility",
            "Accessibility Needs",
            vec![
                WheelchairType,
                Bariatric,
                HearingImpaired,
                VisuallyImpaired,
                SpecialEquipment,
            ],
        ),
        StepDefinition::new(
            "contact",
            "Contact Details",
            vec![
                Phone,
                Email,
                Address,
                City,
                State,
                ZipCode,
                EmergencyContactName,
                EmergencyContactPhone,
                EmergencyContactRelationship,
            ],
        ),
        StepDefinition::new("notes", "Notes & Review", vec![AdditionalNotes, Documents]),
    ])
}

fn rules() -> Vec<CrossFieldRule<PatientField>> {
    let prior_auth = |v: &FormValues<PatientField>| v.is_yes(PriorAuthorization);

    vec![
        CrossFieldRule::required_when(
            "auth-number",
            vec![PriorAuthorization],
            AuthorizationNumber,
            "Authorization number is required when prior authorization is Yes",
            prior_auth,
        ),
        CrossFieldRule::required_when(
            "auth-start",
            vec![PriorAuthorization],
            AuthorizationStartDate,
            "Authorization start date is required when prior authorization is Yes",
            prior_auth,
        ),
        CrossFieldRule::required_when(
            "auth-end",
            vec![PriorAuthorization],
            AuthorizationEndDate,
            "Authorization end date is required when prior authorization is Yes",
            prior_auth,
        ),
        CrossFieldRule::date_order(
            "auth-dates",
            AuthorizationStartDate,
            AuthorizationEndDate,
            "Authorization end date must be on or after the start date",
        ),
        CrossFieldRule::required_when(
            "interpreter-language",
            vec![InterpreterRequired],
            PreferredLanguage,
            "Preferred language is required when an interpreter is needed",
            |v| v.is_yes(InterpreterRequired),
        ),
        CrossFieldRule::required_when(
            "oxygen-flow",
            vec![OxygenRequired],
            OxygenFlowRate,
            "Oxygen flow rate is required when oxygen is needed",
            |v| v.is_yes(OxygenRequired),
        ),
    ]
}

pub fn definition() -> Result<WizardDefinition<PatientField>, DefinitionError> {
    WizardDefinition::new(ID, "Patient Intake", schema(), steps(), rules())
}
