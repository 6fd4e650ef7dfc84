//! Employee registration wizard
//!
//! The medical-license step only appears for clinical roles.

use crate::core::values::FormValues;
use crate::schema::{
    CrossFieldRule, DefinitionError, FieldSchema, FieldSpec, Format, StepDefinition, StepTable,
    WizardDefinition,
};

pub const ID: &str = "employee-registration";

crate::field_registry! {
    /// Fields of the employee registration form
    pub enum EmployeeField {
        PrimaryRole => "primaryRole",
        EmploymentType => "employmentType",
        StartDate => "startDate",
        FirstName => "firstName",
        LastName => "lastName",
        DateOfBirth => "dateOfBirth",
        Phone => "phone",
        Email => "email",
        Address => "address",
        City => "city",
        State => "state",
        ZipCode => "zipCode",
        EmergencyContactName => "emergencyContactName",
        EmergencyContactPhone => "emergencyContactPhone",
        DriversLicenseNumber => "driversLicenseNumber",
        DriversLicenseState => "driversLicenseState",
        DriversLicenseExpiry => "driversLicenseExpiry",
        EvocCertified => "evocCertified",
        EvocDate => "evocDate",
        MedicalLicenseType => "medicalLicenseType",
        MedicalLicenseNumber => "medicalLicenseNumber",
        MedicalLicenseState => "medicalLicenseState",
        MedicalLicenseExpiry => "medicalLicenseExpiry",
        CprCertified => "cprCertified",
        CprExpiry => "cprExpiry",
        AclsCertified => "aclsCertified",
        PhtlsCertified => "phtlsCertified",
        Resume => "resume",
        CertificationDocuments => "certificationDocuments",
        BackgroundCheckConsent => "backgroundCheckConsent",
    }
}

use EmployeeField::*;

/// Roles that hold a state medical license
pub const CLINICAL_ROLES: &[&str] = &["emt", "paramedic", "nurse"];

/// Roles that drive a vehicle
const DRIVING_ROLES: &[&str] = &["driver", "emt", "paramedic"];

fn role_in(values: &FormValues<EmployeeField>, roles: &[&str]) -> bool {
    roles.iter().any(|r| values.equals(PrimaryRole, r))
}

fn schema() -> FieldSchema<EmployeeField> {
    FieldSchema::new()
        .field(
            PrimaryRole,
            FieldSpec::choice(
                "Primary Role",
                &["driver", "emt", "paramedic", "nurse", "dispatcher", "admin"],
            )
            .required(),
        )
        .field(
            EmploymentType,
            FieldSpec::choice("Employment Type", &["full-time", "part-time", "per-diem"])
                .required(),
        )
        .field(StartDate, FieldSpec::date("Start Date").required())
        .field(FirstName, FieldSpec::text("First Name").required().format(Format::AlphaName))
        .field(LastName, FieldSpec::text("Last Name").required().format(Format::AlphaName))
        .field(
            DateOfBirth,
            FieldSpec::date("Date of Birth").required().age_between(18, 80),
        )
        .field(Phone, FieldSpec::text("Phone").required().format(Format::Phone))
        .field(Email, FieldSpec::text("Email").required().format(Format::Email))
        .field(Address, FieldSpec::text("Street Address").required())
        .field(City, FieldSpec::text("City").required())
        .field(State, FieldSpec::text("State").required().format(Format::StateCode))
        .field(ZipCode, FieldSpec::text("ZIP Code").required().format(Format::ZipCode))
        .field(
            EmergencyContactName,
            FieldSpec::text("Emergency Contact Name").required(),
        )
        .field(
            EmergencyContactPhone,
            FieldSpec::text("Emergency Contact Phone").required().format(Format::Phone),
        )
        .field(
            DriversLicenseNumber,
            FieldSpec::text("Driver's License Number").format(Format::LicenseNumber),
        )
        .field(
            DriversLicenseState,
            FieldSpec::text("Driver's License State").format(Format::StateCode),
        )
        .field(
            DriversLicenseExpiry,
            FieldSpec::date("Driver's License Expiry").not_past(),
        )
        .field(EvocCertified, FieldSpec::boolean("EVOC Certified"))
        .field(EvocDate, FieldSpec::date("EVOC Completion Date").not_future())
        .field(
            MedicalLicenseType,
            FieldSpec::choice(
                "License Type",
                &["emt-basic", "emt-advanced", "paramedic", "rn", "lpn"],
            )
            .required(),
        )
        .field(
            MedicalLicenseNumber,
            FieldSpec::text("Medical License Number")
                .required()
                .format(Format::LicenseNumber),
        )
        .field(
            MedicalLicenseState,
            FieldSpec::text("License State").required().format(Format::StateCode),
        )
        .field(
            MedicalLicenseExpiry,
            FieldSpec::date("License Expiry").required().not_past(),
        )
        .field(CprCertified, FieldSpec::boolean("CPR Certified"))
        .field(CprExpiry, FieldSpec::date("CPR Expiry").not_past())
        .field(AclsCertified, FieldSpec::boolean("ACLS Certified"))
        .field(PhtlsCertified, FieldSpec::boolean("PHTLS Certified"))
        .field(Resume, FieldSpec::attachment("Resume"))
        .field(
            CertificationDocuments,
            FieldSpec::attachments("Certification Documents"),
        )
        .field(
            BackgroundCheckConsent,
            FieldSpec::boolean("Background Check Consent")
                .required()
                .custom("Background check consent is required", |v| v.is_yes()),
        )
}

fn steps() -> StepTable<EmployeeField> {
    StepTable::new(vec![
        StepDefinition::new("role", "Role", vec![PrimaryRole, EmploymentType, StartDate]),
        StepDefinition::new("personal", "Personal Information", vec![FirstName, LastName, DateOfBirth]),
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
            ],
        ),
        StepDefinition::new(
            "driver",
            "Driver Information",
            vec![
                DriversLicenseNumber,
                DriversLicenseState,
                DriversLicenseExpiry,
                EvocCertified,
                EvocDate,
            ],
        ),
        StepDefinition::new(
            "medical-license",
            "Medical License",
            vec![
                MedicalLicenseType,
                MedicalLicenseNumber,
                MedicalLicenseState,
                MedicalLicenseExpiry,
            ],
        )
        .include_if(vec![PrimaryRole], |v| role_in(v, CLINICAL_ROLES)),
        StepDefinition::new(
            "certifications",
            "Certifications",
            vec![CprCertified, CprExpiry, AclsCertified, PhtlsCertified],
        ),
        StepDefinition::new(
            "documents",
            "Documents",
            vec![Resume, CertificationDocuments, BackgroundCheckConsent],
        ),
        StepDefinition::review("review", "Review"),
    ])
}

fn rules() -> Vec<CrossFieldRule<EmployeeField>> {
    vec![
        CrossFieldRule::required_when(
            "drivers-license",
            vec![PrimaryRole],
            DriversLicenseNumber,
            "A driver's license is required for driving roles",
            |v| role_in(v, DRIVING_ROLES),
        ),
        CrossFieldRule::required_when(
            "evoc-date",
            vec![EvocCertified],
            EvocDate,
            "EVOC completion date is required when EVOC certified",
            |v| v.is_yes(EvocCertified),
        ),
        CrossFieldRule::required_when(
            "cpr-expiry",
            vec![CprCertified],
            CprExpiry,
            "CPR expiry date is required when CPR certified",
            |v| v.is_yes(CprCertified),
        ),
    ]
}

pub fn definition() -> Result<WizardDefinition<EmployeeField>, DefinitionError> {
    WizardDefinition::new(ID, "Employee Registration", schema(), steps(), rules())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::draft::MemoryDraftStore;
    use crate::core::wizard::{Navigation, Wizard};
    use chrono::NaiveDate;

    fn wizard() -> Wizard<EmployeeField> {
        Wizard::new(definition().unwrap(), MemoryDraftStore::new())
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
    }

    fn fill_through_contact(w: &mut Wizard<EmployeeField>, role: &str) {
        w.set_value(PrimaryRole, role).unwrap();
        w.set_value(EmploymentType, "full-time").unwrap();
        w.set_value(StartDate, "2025-07-01").unwrap();
        assert!(w.next().unwrap().moved());
        w.set_value(FirstName, "Jordan").unwrap();
        w.set_value(LastName, "Reyes").unwrap();
        w.set_value(DateOfBirth, "1990-04-02").unwrap();
        assert!(w.next().unwrap().moved());
        w.set_value(Phone, "(555) 404-1212").unwrap();
        w.set_value(Email, "jordan@example.com").unwrap();
        w.set_value(Address, "12 Elm St").unwrap();
        w.set_value(City, "Springfield").unwrap();
        w.set_value(State, "IL").unwrap();
        w.set_value(ZipCode, "62704").unwrap();
        w.set_value(EmergencyContactName, "Sam Reyes").unwrap();
        w.set_value(EmergencyContactPhone, "555-404-3434").unwrap();
        assert!(w.next().unwrap().moved());
        assert_eq!(w.current_step().id, "driver");
    }

    #[test]
    fn test_definition_is_consistent() {
        let def = definition().unwrap();
        assert!(def.orphaned_fields().is_empty());
        assert_eq!(
            def.steps().iter().filter(|s| s.is_conditional()).count(),
            1,
            "medical-license is the only conditional step"
        );
    }

    #[test]
    fn test_driver_never_sees_medical_license() {
        let mut w = wizard();
        fill_through_contact(&mut w, "driver");
        w.set_value(DriversLicenseNumber, "D4410-2231").unwrap();
        w.next().unwrap();
        assert_eq!(w.current_step().id, "certifications");

        let ids: Vec<_> = w
            .active_sequence()
            .into_iter()
            .filter_map(|o| w.definition().step(o).map(|s| s.id))
            .collect();
        assert!(!ids.contains(&"medical-license"));
        assert_eq!(w.progress(), (5, 7));
    }

    #[test]
    fn test_driver_needs_license() {
        let mut w = wizard();
        fill_through_contact(&mut w, "driver");
        match w.next().unwrap() {
            Navigation::Blocked { focus, .. } => assert_eq!(focus, Some(DriversLicenseNumber)),
            other => panic!("expected blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatcher_skips_license() {
        let mut w = wizard();
        fill_through_contact(&mut w, "dispatcher");
        assert!(w.next().unwrap().moved());
        assert_eq!(w.current_step().id, "certifications");
    }

    #[test]
    fn test_paramedic_medical_license() {
        let mut w = wizard();
        fill_through_contact(&mut w, "paramedic");
        w.set_value(DriversLicenseNumber, "D4410-2231").unwrap();
        w.next().unwrap();
        assert_eq!(w.current_step().id, "medical-license");

        w.set_value(MedicalLicenseType, "paramedic").unwrap();
        w.set_value(MedicalLicenseNumber, "P-889201").unwrap();
        w.set_value(MedicalLicenseState, "IL").unwrap();
        w.set_value(MedicalLicenseExpiry, "2024-12-31").unwrap();
        assert!(!w.next().unwrap().moved());
        assert_eq!(
            w.error_for(MedicalLicenseExpiry),
            Some("License Expiry cannot be in the past")
        );

        w.set_value(MedicalLicenseExpiry, "2026-12-31").unwrap();
        w.next().unwrap();
        assert_eq!(w.current_step().id, "certifications");
    }

    #[test]
    fn test_certification_dates_required() {
        let mut w = wizard();
        fill_through_contact(&mut w, "dispatcher");
        w.set_value(EvocCertified, true).unwrap();
        assert!(!w.next().unwrap().moved());
        assert!(w.error_for(EvocDate).is_some());
        w.set_value(EvocDate, "2023-03-01").unwrap();
        w.next().unwrap();

        w.set_value(CprCertified, true).unwrap();
        assert!(!w.next().unwrap().moved());
        assert_eq!(
            w.error_for(CprExpiry),
            Some("CPR expiry date is required when CPR certified")
        );
    }

    #[test]
    fn test_background_consent_must_be_given() {
        let mut w = wizard();
        fill_through_contact(&mut w, "dispatcher");
        w.jump_to("documents").unwrap();
        assert_eq!(w.current_step().id, "documents");
        assert!(!w.validate_current_step());
        assert_eq!(
            w.error_for(BackgroundCheckConsent),
            Some("Background check consent is required")
        );
    }
}
