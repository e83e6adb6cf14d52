//! Declarative per-step constraints and cross-field rules.
//!
//! Schemas are static tables keyed by step path. Validation is a pure function of
//! the form document; it never touches storage or application state.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::domain::FormDocument;
use super::steps::ApplicationType;

/// Single-field constraint. Missing values only trip `Required`, `MinItems` and `MustBeTrue`.
#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    Required,
    MaxLength(usize),
    Email,
    Phone,
    Date,
    Year { min: i64, max: i64 },
    Min(i64),
    OneOf(&'static [&'static str]),
    MinItems(usize),
    MustBeTrue,
    /// Apply nested rules to every element of an array.
    Each(&'static ItemSchema),
}

/// Rule spanning more than one field.
#[derive(Debug, Clone, Copy)]
pub enum CrossFieldRule {
    /// `field` becomes required when `when` holds `equals`.
    RequiredWhen {
        field: &'static str,
        when: &'static str,
        equals: Expected,
    },
    /// `end`, when present, must not precede `start`.
    DateOrder {
        start: &'static str,
        end: &'static str,
    },
    /// Numeric `count` must equal the length of array `list`.
    CountMatches {
        count: &'static str,
        list: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum Expected {
    Bool(bool),
    Text(&'static str),
}

impl Expected {
    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Expected::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            (Expected::Text(expected), Some(Value::String(actual))) => expected == actual,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub path: &'static str,
    pub constraints: &'static [Constraint],
}

#[derive(Debug, Clone, Copy)]
pub struct ItemSchema {
    pub fields: &'static [FieldRule],
    pub cross: &'static [CrossFieldRule],
}

#[derive(Debug, Clone, Copy)]
pub struct StepSchema {
    pub step_path: &'static str,
    pub fields: &'static [FieldRule],
    pub cross: &'static [CrossFieldRule],
}

/// Constraint violation reported against a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const ADMISSION_STATUSES: &[&str] = &["active", "inactive", "retired", "pending"];
const GRADUATION_YEARS: Constraint = Constraint::Year {
    min: 1950,
    max: 2100,
};

const DEGREE: ItemSchema = ItemSchema {
    fields: &[
        FieldRule {
            path: "institution",
            constraints: &[Constraint::Required, Constraint::MaxLength(200)],
        },
        FieldRule {
            path: "degree",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "year",
            constraints: &[Constraint::Required, GRADUATION_YEARS],
        },
    ],
    cross: &[],
};

const ADMISSION: ItemSchema = ItemSchema {
    fields: &[
        FieldRule {
            path: "jurisdiction",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "year",
            constraints: &[Constraint::Required, GRADUATION_YEARS],
        },
        FieldRule {
            path: "status",
            constraints: &[Constraint::Required, Constraint::OneOf(ADMISSION_STATUSES)],
        },
    ],
    cross: &[],
};

const POSITION: ItemSchema = ItemSchema {
    fields: &[
        FieldRule {
            path: "firm",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "title",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "start_date",
            constraints: &[Constraint::Required, Constraint::Date],
        },
        FieldRule {
            path: "end_date",
            constraints: &[Constraint::Date],
        },
    ],
    cross: &[CrossFieldRule::DateOrder {
        start: "start_date",
        end: "end_date",
    }],
};

const REFERENCE: ItemSchema = ItemSchema {
    fields: &[
        FieldRule {
            path: "name",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "email",
            constraints: &[Constraint::Required, Constraint::Email],
        },
        FieldRule {
            path: "relationship",
            constraints: &[Constraint::Required],
        },
    ],
    cross: &[],
};

const MEMBER: ItemSchema = ItemSchema {
    fields: &[
        FieldRule {
            path: "name",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "title",
            constraints: &[Constraint::Required],
        },
        FieldRule {
            path: "email",
            constraints: &[Constraint::Required, Constraint::Email],
        },
    ],
    cross: &[],
};

const CONFLICT_FIELDS: &[FieldRule] = &[
    FieldRule {
        path: "conflicts.has_potential_conflicts",
        constraints: &[Constraint::Required],
    },
    FieldRule {
        path: "conflicts.has_restrictive_covenants",
        constraints: &[Constraint::Required],
    },
    FieldRule {
        path: "conflicts.details",
        constraints: &[Constraint::MaxLength(4000)],
    },
];

const CONFLICT_RULES: &[CrossFieldRule] = &[
    CrossFieldRule::RequiredWhen {
        field: "conflicts.details",
        when: "conflicts.has_potential_conflicts",
        equals: Expected::Bool(true),
    },
    CrossFieldRule::RequiredWhen {
        field: "conflicts.covenant_details",
        when: "conflicts.has_restrictive_covenants",
        equals: Expected::Bool(true),
    },
];

const REFERENCE_FIELDS: &[FieldRule] = &[FieldRule {
    path: "references.references",
    constraints: &[Constraint::MinItems(2), Constraint::Each(&REFERENCE)],
}];

const REVIEW_FIELDS: &[FieldRule] = &[FieldRule {
    path: "review.attestation",
    constraints: &[Constraint::MustBeTrue],
}];

static INDIVIDUAL_SCHEMAS: [StepSchema; 8] = [
    StepSchema {
        step_path: "/application/bio",
        fields: &[
            FieldRule {
                path: "bio.first_name",
                constraints: &[Constraint::Required, Constraint::MaxLength(100)],
            },
            FieldRule {
                path: "bio.last_name",
                constraints: &[Constraint::Required, Constraint::MaxLength(100)],
            },
            FieldRule {
                path: "bio.email",
                constraints: &[Constraint::Required, Constraint::Email],
            },
            FieldRule {
                path: "bio.phone",
                constraints: &[Constraint::Required, Constraint::Phone],
            },
            FieldRule {
                path: "bio.current_firm",
                constraints: &[Constraint::Required],
            },
        ],
        cross: &[],
    },
    StepSchema {
        step_path: "/application/education",
        fields: &[FieldRule {
            path: "education.degrees",
            constraints: &[Constraint::MinItems(1), Constraint::Each(&DEGREE)],
        }],
        cross: &[],
    },
    StepSchema {
        step_path: "/application/admissions",
        fields: &[
            FieldRule {
                path: "admissions.admissions",
                constraints: &[Constraint::MinItems(1), Constraint::Each(&ADMISSION)],
            },
            FieldRule {
                path: "admissions.disciplinary_history",
                constraints: &[Constraint::Required],
            },
        ],
        cross: &[CrossFieldRule::RequiredWhen {
            field: "admissions.disciplinary_details",
            when: "admissions.disciplinary_history",
            equals: Expected::Bool(true),
        }],
    },
    StepSchema {
        step_path: "/application/employment",
        fields: &[FieldRule {
            path: "employment.positions",
            constraints: &[Constraint::MinItems(1), Constraint::Each(&POSITION)],
        }],
        cross: &[],
    },
    StepSchema {
        step_path: "/application/practice",
        fields: &[
            FieldRule {
                path: "practice.practice_areas",
                constraints: &[Constraint::MinItems(1)],
            },
            FieldRule {
                path: "practice.annual_hours",
                constraints: &[Constraint::Required, Constraint::Min(0)],
            },
            FieldRule {
                path: "practice.portable_revenue",
                constraints: &[Constraint::Min(0)],
            },
        ],
        cross: &[],
    },
    StepSchema {
        step_path: "/application/conflicts",
        fields: CONFLICT_FIELDS,
        cross: CONFLICT_RULES,
    },
    StepSchema {
        step_path: "/application/references",
        fields: REFERENCE_FIELDS,
        cross: &[],
    },
    StepSchema {
        step_path: "/application/review",
        fields: REVIEW_FIELDS,
        cross: &[],
    },
];

static GROUP_SCHEMAS: [StepSchema; 7] = [
    StepSchema {
        step_path: "/group/overview",
        fields: &[
            FieldRule {
                path: "overview.group_name",
                constraints: &[Constraint::Required, Constraint::MaxLength(200)],
            },
            FieldRule {
                path: "overview.current_firm",
                constraints: &[Constraint::Required],
            },
            FieldRule {
                path: "overview.lead_partner_email",
                constraints: &[Constraint::Required, Constraint::Email],
            },
            FieldRule {
                path: "overview.member_count",
                constraints: &[Constraint::Required, Constraint::Min(2)],
            },
        ],
        cross: &[],
    },
    StepSchema {
        step_path: "/group/members",
        fields: &[FieldRule {
            path: "members.members",
            constraints: &[Constraint::MinItems(2), Constraint::Each(&MEMBER)],
        }],
        cross: &[CrossFieldRule::CountMatches {
            count: "overview.member_count",
            list: "members.members",
        }],
    },
    StepSchema {
        step_path: "/group/practice",
        fields: &[FieldRule {
            path: "practice.practice_areas",
            constraints: &[Constraint::MinItems(1)],
        }],
        cross: &[],
    },
    StepSchema {
        step_path: "/group/financials",
        fields: &[
            FieldRule {
                path: "financials.collections_last_year",
                constraints: &[Constraint::Required, Constraint::Min(0)],
            },
            FieldRule {
                path: "financials.collections_prior_year",
                constraints: &[Constraint::Required, Constraint::Min(0)],
            },
            FieldRule {
                path: "financials.expected_portable_percent",
                constraints: &[Constraint::Required, Constraint::Min(0)],
            },
        ],
        cross: &[],
    },
    StepSchema {
        step_path: "/group/conflicts",
        fields: CONFLICT_FIELDS,
        cross: CONFLICT_RULES,
    },
    StepSchema {
        step_path: "/group/references",
        fields: REFERENCE_FIELDS,
        cross: &[],
    },
    StepSchema {
        step_path: "/group/review",
        fields: REVIEW_FIELDS,
        cross: &[],
    },
];

pub fn schemas_for(application_type: ApplicationType) -> &'static [StepSchema] {
    match application_type {
        ApplicationType::Individual => &INDIVIDUAL_SCHEMAS,
        ApplicationType::Group => &GROUP_SCHEMAS,
    }
}

pub fn schema_for_step(step_path: &str) -> Option<&'static StepSchema> {
    INDIVIDUAL_SCHEMAS
        .iter()
        .chain(GROUP_SCHEMAS.iter())
        .find(|schema| schema.step_path == step_path)
}

/// Validate the fields owned by one step. Unknown steps carry no constraints.
pub fn validate_step(step_path: &str, document: &FormDocument) -> Vec<FieldError> {
    schema_for_step(step_path)
        .map(|schema| check_schema(schema, document))
        .unwrap_or_default()
}

/// Validate every step of the catalog for `application_type`, in step order.
pub fn validate(application_type: ApplicationType, document: &FormDocument) -> Vec<FieldError> {
    schemas_for(application_type)
        .iter()
        .flat_map(|schema| check_schema(schema, document))
        .collect()
}

fn check_schema(schema: &StepSchema, document: &FormDocument) -> Vec<FieldError> {
    let lookup = |path: &str| document.get(path);
    let mut errors = Vec::new();
    check_fields(schema.fields, "", &lookup, &mut errors);
    check_cross(schema.cross, "", &lookup, &mut errors);
    errors
}

fn check_fields<'a>(
    rules: &[FieldRule],
    prefix: &str,
    lookup: &dyn Fn(&str) -> Option<&'a Value>,
    errors: &mut Vec<FieldError>,
) {
    for rule in rules {
        let value = lookup(rule.path).filter(|value| !value.is_null());
        let field = format!("{prefix}{}", rule.path);
        for constraint in rule.constraints {
            if let Some(message) = check_constraint(constraint, value, &field, errors) {
                errors.push(FieldError::new(field.clone(), message));
                break;
            }
        }
    }
}

fn check_cross<'a>(
    rules: &[CrossFieldRule],
    prefix: &str,
    lookup: &dyn Fn(&str) -> Option<&'a Value>,
    errors: &mut Vec<FieldError>,
) {
    for rule in rules {
        match *rule {
            CrossFieldRule::RequiredWhen { field, when, equals } => {
                if equals.matches(lookup(when)) && is_blank(lookup(field)) {
                    errors.push(FieldError::new(
                        format!("{prefix}{field}"),
                        format!("required when {when} is answered"),
                    ));
                }
            }
            CrossFieldRule::DateOrder { start, end } => {
                let start_date = lookup(start).and_then(parse_date);
                let end_date = lookup(end).and_then(parse_date);
                if let (Some(start_date), Some(end_date)) = (start_date, end_date) {
                    if end_date < start_date {
                        errors.push(FieldError::new(
                            format!("{prefix}{end}"),
                            format!("must not be before {start}"),
                        ));
                    }
                }
            }
            CrossFieldRule::CountMatches { count, list } => {
                let declared = lookup(count).and_then(Value::as_i64);
                let listed = lookup(list).and_then(Value::as_array).map(Vec::len);
                if let (Some(declared), Some(listed)) = (declared, listed) {
                    if declared != listed as i64 {
                        errors.push(FieldError::new(
                            format!("{prefix}{list}"),
                            format!("lists {listed} entries but {count} is {declared}"),
                        ));
                    }
                }
            }
        }
    }
}

/// Returns the failure message for `constraint`, if any. Nested item errors are
/// pushed directly into `errors`.
fn check_constraint(
    constraint: &Constraint,
    value: Option<&Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match constraint {
        Constraint::Required => {
            return is_blank(value).then(|| "is required".to_string());
        }
        Constraint::MustBeTrue => {
            return (!matches!(value, Some(Value::Bool(true))))
                .then(|| "must be confirmed".to_string());
        }
        Constraint::MinItems(min) if value.is_none() => {
            return Some(min_items_message(*min));
        }
        _ => {}
    }

    let value = value?;
    match *constraint {
        Constraint::Required | Constraint::MustBeTrue => None,
        Constraint::MaxLength(max) => match value.as_str() {
            Some(text) if text.chars().count() > max => {
                Some(format!("must be at most {max} characters"))
            }
            _ => None,
        },
        Constraint::Email => string_matching(value, email_pattern(), "must be a valid email"),
        Constraint::Phone => {
            string_matching(value, phone_pattern(), "must be a valid phone number")
        }
        Constraint::Date => match value {
            Value::String(_) if parse_date(value).is_some() => None,
            _ => Some("must be a date formatted YYYY-MM-DD".to_string()),
        },
        Constraint::Year { min, max } => match as_integer(value) {
            Some(year) if (min..=max).contains(&year) => None,
            _ => Some(format!("must be a year between {min} and {max}")),
        },
        Constraint::Min(min) => match as_integer(value) {
            Some(number) if number >= min => None,
            Some(_) => Some(format!("must be at least {min}")),
            None => Some("must be a number".to_string()),
        },
        Constraint::OneOf(options) => match value.as_str() {
            Some(text) if options.contains(&text) => None,
            _ => Some(format!("must be one of: {}", options.join(", "))),
        },
        Constraint::MinItems(min) => match value.as_array() {
            Some(items) if items.len() >= min => None,
            Some(_) => Some(min_items_message(min)),
            None => Some("must be a list".to_string()),
        },
        Constraint::Each(schema) => {
            let items = value.as_array()?;
            for (index, item) in items.iter().enumerate() {
                let prefix = format!("{field}[{index}].");
                let lookup = |path: &str| item.get(path);
                check_fields(schema.fields, &prefix, &lookup, errors);
                check_cross(schema.cross, &prefix, &lookup, errors);
            }
            None
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn min_items_message(min: usize) -> String {
    if min == 1 {
        "must include at least one entry".to_string()
    } else {
        format!("must include at least {min} entries")
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.floor() as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn string_matching(value: &Value, pattern: &Regex, message: &str) -> Option<String> {
    match value.as_str() {
        Some(text) if pattern.is_match(text.trim()) => None,
        _ => Some(message.to_string()),
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"^\+?[0-9 ().-]{7,20}$").expect("phone pattern compiles")
    })
}
