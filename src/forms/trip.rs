//! Trip intake wizard
//!
//! Return-leg fields live on the locations step and become required when
//! the trip is a round trip.

use crate::core::values::FormValues;
use crate::schema::{
    CrossFieldRule, DefinitionError, FieldSchema, FieldSpec, Format, StepDefinition, StepTable,
    WizardDefinition,
};

pub const ID: &str = "trip-intake";

crate::field_registry! {
    /// Fields of the trip intake form
    pub enum TripField {
        CreationMethod => "creationMethod",
        TemplateName => "templateName",
        RecurrencePattern => "recurrencePattern",
        RecurrenceEndDate => "recurrenceEndDate",
        TripMode => "tripMode",
        Priority => "priority",
        TripDate => "tripDate",
        PickupTime => "pickupTime",
        AppointmentTime => "appointmentTime",
        FlexibleTiming => "flexibleTiming",
        WaitTimeMinutes => "waitTimeMinutes",
        EstimatedDurationMinutes => "estimatedDurationMinutes",
        PatientId => "patientId",
        PatientName => "patientName",
        ServiceLevel => "serviceLevel",
        SpecialNeeds => "specialNeeds",
        EscortCount => "escortCount",
        PatientWeightLbs => "patientWeightLbs",
        PickupFacility => "pickupFacility",
        PickupAddress => "pickupAddress",
        PickupCity => "pickupCity",
        PickupState => "pickupState",
        PickupZip => "pickupZip",
        PickupLocation => "pickupLocation",
        PickupInstructions => "pickupInstructions",
        DropoffFacility => "dropoffFacility",
        DropoffAddress => "dropoffAddress",
        DropoffCity => "dropoffCity",
        DropoffState => "dropoffState",
        DropoffZip => "dropoffZip",
        DropoffLocation => "dropoffLocation",
        DropoffInstructions => "dropoffInstructions",
        ReturnTime => "returnTime",
        ReturnPickupAddress => "returnPickupAddress",
        ReturnPickupCity => "returnPickupCity",
        ReturnPickupState => "returnPickupState",
        ReturnPickupZip => "returnPickupZip",
        AssignmentType => "assignmentType",
        VehicleId => "vehicleId",
        DriverId => "driverId",
        AttendantId => "attendantId",
        CrewNotes => "crewNotes",
        BaseRate => "baseRate",
        Mileage => "mileage",
        MileageRate => "mileageRate",
        AdditionalCharges => "additionalCharges",
        BillingMethod => "billingMethod",
        AuthorizationNumber => "authorizationNumber",
        InvoiceNotes => "invoiceNotes",
    }
}

use TripField::*;

fn schema() -> FieldSchema<TripField> {
    FieldSchema::new()
        .field(
            CreationMethod,
            FieldSpec::choice("Creation Method", &["new", "template", "recurring"])
                .required()
                .default_value("new"),
        )
        .field(TemplateName, FieldSpec::text("Template Name"))
        .field(
            RecurrencePattern,
            FieldSpec::choice(
                "Recurrence Pattern",
                &["daily", "weekdays", "weekly", "monthly"],
            ),
        )
        .field(RecurrenceEndDate, FieldSpec::date("Recurrence End Date").not_past())
        .field(
            TripMode,
            FieldSpec::choice("Trip Mode", &["One Way", "Round Trip"])
                .required()
                .default_value("One Way"),
        )
        .field(
            Priority,
            FieldSpec::choice("Priority", &["routine", "urgent", "emergency"])
                .default_value("routine"),
        )
        .field(TripDate, FieldSpec::date("Trip Date").required().not_past())
        .field(PickupTime, FieldSpec::time("Pickup Time").required())
        .field(AppointmentTime, FieldSpec::time("Appointment Time"))
        .field(FlexibleTiming, FieldSpec::boolean("Flexible Timing"))
        .field(
            WaitTimeMinutes,
            FieldSpec::number("Wait Time (minutes)").range(0.0, 480.0),
        )
        .field(
            EstimatedDurationMinutes,
            FieldSpec::number("Estimated Duration (minutes)").range(1.0, 720.0),
        )
        .field(
            PatientId,
            FieldSpec::text("Patient Record Number")
                .required()
                .format(Format::RecordNumber),
        )
        .field(PatientName, FieldSpec::text("Patient Name").required())
        .field(
            ServiceLevel,
            FieldSpec::choice(
                "Service Level",
                &["ambulatory", "wheelchair", "stretcher", "bls", "als"],
            )
            .required(),
        )
        .field(
            SpecialNeeds,
            FieldSpec::multi_choice(
                "Special Needs",
                &["oxygen", "bariatric", "isolation", "interpreter", "escort"],
            ),
        )
        .field(EscortCount, FieldSpec::number("Escorts").range(0.0, 3.0))
        .field(
            PatientWeightLbs,
            FieldSpec::number("Patient Weight (lbs)").range(1.0, 1000.0),
        )
        .field(PickupFacility, FieldSpec::text("Pickup Facility"))
        .field(PickupAddress, FieldSpec::text("Pickup Address").required())
        .field(PickupCity, FieldSpec::text("Pickup City").required())
        .field(
            PickupState,
            FieldSpec::text("Pickup State").required().format(Format::StateCode),
        )
        .field(
            PickupZip,
            FieldSpec::text("Pickup ZIP").required().format(Format::ZipCode),
        )
        .field(PickupLocation, FieldSpec::location("Pickup Map Location"))
        .field(PickupInstructions, FieldSpec::long_text("Pickup Instructions"))
        .field(DropoffFacility, FieldSpec::text("Drop-off Facility"))
        .field(DropoffAddress, FieldSpec::text("Drop-off Address").required())
        .field(DropoffCity, FieldSpec::text("Drop-off City").required())
        .field(
            DropoffState,
            FieldSpec::text("Drop-off State").required().format(Format::StateCode),
        )
        .field(
            DropoffZip,
            FieldSpec::text("Drop-off ZIP").required().format(Format::ZipCode),
        )
        .field(DropoffLocation, FieldSpec::location("Drop-off Map Location"))
        .field(DropoffInstructions, FieldSpec::long_text("Drop-off Instructions"))
        .field(ReturnTime, FieldSpec::time("Return Pickup Time"))
        .field(ReturnPickupAddress, FieldSpec::text("Return Pickup Address"))
        .field(ReturnPickupCity, FieldSpec::text("Return Pickup City"))
        .field(
            ReturnPickupState,
            FieldSpec::text("Return Pickup State").format(Format::StateCode),
        )
        .field(
            ReturnPickupZip,
            FieldSpec::text("Return Pickup ZIP").format(Format::ZipCode),
        )
        .field(
            AssignmentType,
            FieldSpec::choice("Assignment", &["auto", "manual"])
                .required()
                .default_value("auto"),
        )
        .field(VehicleId, FieldSpec::text("Vehicle"))
        .field(DriverId, FieldSpec::text("Driver"))
        .field(AttendantId, FieldSpec::text("Attendant"))
        .field(CrewNotes, FieldSpec::long_text("Crew Notes"))
        .field(
            BaseRate,
            FieldSpec::number("Base Rate").required().range(0.0, 10_000.0),
        )
        .field(Mileage, FieldSpec::number("Mileage").range(0.0, 1_000.0))
        .field(MileageRate, FieldSpec::number("Rate per Mile").range(0.0, 100.0))
        .field(
            AdditionalCharges,
            FieldSpec::number("Additional Charges").range(0.0, 10_000.0),
        )
        .field(
            BillingMethod,
            FieldSpec::choice("Billing Method", &["insurance", "facility", "private-pay"])
                .required(),
        )
        .field(AuthorizationNumber, FieldSpec::text("Authorization Number"))
        .field(InvoiceNotes, FieldSpec::long_text("Invoice Notes"))
}

fn steps() -> StepTable<TripField> {
    StepTable::new(vec![
        StepDefinition::new(
            "method",
            "Creation Method",
            vec![
                CreationMethod,
                TemplateName,
                RecurrencePattern,
                RecurrenceEndDate,
                TripMode,
                Priority,
            ],
        ),
        StepDefinition::new(
            "timing",
            "Date & Time",
            vec![
                TripDate,
                PickupTime,
                AppointmentTime,
                FlexibleTiming,
                WaitTimeMinutes,
                EstimatedDurationMinutes,
            ],
        ),
        StepDefinition::new(
            "patient",
            "Patient & Service",
            vec![
                PatientId,
                PatientName,
                ServiceLevel,
                SpecialNeeds,
                EscortCount,
                PatientWeightLbs,
            ],
        ),
        StepDefinition::new(
            "locations",
            "Locations",
            vec![
                PickupFacility,
                PickupAddress,
                PickupCity,
                PickupState,
                PickupZip,
                PickupLocation,
                PickupInstructions,
                DropoffFacility,
                DropoffAddress,
                DropoffCity,
                DropoffState,
                DropoffZip,
                DropoffLocation,
                DropoffInstructions,
                ReturnTime,
                ReturnPickupAddress,
                ReturnPickupCity,
                ReturnPickupState,
                ReturnPickupZip,
            ],
        ),
        StepDefinition::new(
            "crew",
            "Crew Assignment",
            vec![AssignmentType, VehicleId, DriverId, AttendantId, CrewNotes],
        ),
        StepDefinition::new(
            "pricing",
            "Pricing & Billing",
            vec![
                BaseRate,
                Mileage,
                MileageRate,
                AdditionalCharges,
                BillingMethod,
                AuthorizationNumber,
                InvoiceNotes,
            ],
        ),
        StepDefinition::review("review", "Review"),
    ])
}

fn round_trip(values: &FormValues<TripField>) -> bool {
    values.equals(TripMode, "Round Trip")
}

fn rules() -> Vec<CrossFieldRule<TripField>> {
    let mut rules = vec![
        CrossFieldRule::required_when(
            "template-name",
            vec![CreationMethod],
            TemplateName,
            "Template name is required when creating from a template",
            |v| v.equals(CreationMethod, "template"),
        ),
        CrossFieldRule::required_when(
            "recurrence-pattern",
            vec![CreationMethod],
            RecurrencePattern,
            "Recurrence pattern is required for recurring trips",
            |v| v.equals(CreationMethod, "recurring"),
        ),
        CrossFieldRule::required_when(
            "recurrence-end",
            vec![CreationMethod],
            RecurrenceEndDate,
            "Recurrence end date is required for recurring trips",
            |v| v.equals(CreationMethod, "recurring"),
        ),
        CrossFieldRule::time_order(
            "appointment-after-pickup",
            PickupTime,
            AppointmentTime,
            "Appointment time must be after the pickup time",
        ),
        CrossFieldRule::required_when(
            "manual-vehicle",
            vec![AssignmentType],
            VehicleId,
            "Select a vehicle for manual assignment",
            |v| v.equals(AssignmentType, "manual"),
        ),
        CrossFieldRule::required_when(
            "manual-driver",
            vec![AssignmentType],
            DriverId,
            "Select a driver for manual assignment",
            |v| v.equals(AssignmentType, "manual"),
        ),
    ];

    let return_leg = [
        (ReturnTime, "return-time", "Return pickup time is required for round trips"),
        (ReturnPickupAddress, "return-address", "Return pickup address is required for round trips"),
        (ReturnPickupCity, "return-city", "Return pickup city is required for round trips"),
        (ReturnPickupState, "return-state", "Return pickup state is required for round trips"),
        (ReturnPickupZip, "return-zip", "Return pickup ZIP is required for round trips"),
    ];
    rules.extend(return_leg.into_iter().map(|(field, name, message)| {
        CrossFieldRule::required_when(name, vec![TripMode], field, message, round_trip)
    }));

    rules
}

pub fn definition() -> Result<WizardDefinition<TripField>, DefinitionError> {
    WizardDefinition::new(ID, "Trip Intake", schema(), steps(), rules())
}
