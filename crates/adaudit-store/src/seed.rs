//! Demo catalog loaded when `[seed] demo_materials = true`.

use chrono::NaiveDate;

use adaudit_utils::error::AuditError;
use adaudit_utils::ids::MaterialId;
use adaudit_utils::types::{
    Compliance, ContentType, MaterialStatus, QualityPrediction, ViolationTag,
};

use adaudit_utils::types::ContentType::{Image, Text, Video};
use adaudit_utils::types::QualityPrediction::{HighQuality, LowQuality, MediumQuality};

use crate::material::Material;
use crate::state::AuditState;

/// Account that owns the video materials in the demo catalog.
pub const DEMO_VIDEO_ACCOUNT: &str = "qianchuan-client";

struct Row {
    name: &'static str,
    content_type: ContentType,
    status: MaterialStatus,
    compliance: Compliance,
    prediction: QualityPrediction,
    violations: &'static [ViolationTag],
    spend: f64,
    ctr: f64,
    uploader: &'static str,
    account: &'static str,
    created_on: (i32, u32, u32),
}

const ROWS: &[Row] = &[
    Row {
        name: "Summer Sale Banner",
        content_type: Image,
        status: MaterialStatus::Approved,
        compliance: Compliance::Passed,
        prediction: HighQuality,
        violations: &[],
        spend: 1250.0,
        ctr: 3.2,
        uploader: "zhang.san",
        account: "client-a",
        created_on: (2024, 6, 15),
    },
    Row {
        name: "Product Demo Video",
        content_type: Video,
        status: MaterialStatus::Testing,
        compliance: Compliance::Pending,
        prediction: MediumQuality,
        violations: &[],
        spend: 890.0,
        ctr: 2.1,
        uploader: "li.si",
        account: DEMO_VIDEO_ACCOUNT,
        created_on: (2024, 6, 18),
    },
    Row {
        name: "Holiday Campaign Copy",
        content_type: Text,
        status: MaterialStatus::Flagged,
        compliance: Compliance::Failed,
        prediction: LowQuality,
        violations: &[ViolationTag::MisleadingClaim, ViolationTag::InappropriateContent],
        spend: 450.0,
        ctr: 0.8,
        uploader: "wang.wu",
        account: "client-c",
        created_on: (2024, 6, 20),
    },
    Row {
        name: "New Product Launch",
        content_type: Image,
        status: MaterialStatus::Approved,
        compliance: Compliance::Passed,
        prediction: HighQuality,
        violations: &[],
        spend: 2100.0,
        ctr: 4.5,
        uploader: "zhao.liu",
        account: "client-a",
        created_on: (2024, 6, 22),
    },
    Row {
        name: "Weekend Special Offer",
        content_type: Video,
        status: MaterialStatus::Pending,
        compliance: Compliance::Pending,
        prediction: QualityPrediction::Pending,
        violations: &[],
        spend: 0.0,
        ctr: 0.0,
        uploader: "zhang.san",
        account: "client-d",
        created_on: (2024, 6, 25),
    },
    Row {
        name: "Back to School Campaign",
        content_type: Text,
        status: MaterialStatus::Approved,
        compliance: Compliance::Passed,
        prediction: MediumQuality,
        violations: &[],
        spend: 680.0,
        ctr: 2.8,
        uploader: "li.si",
        account: "client-b",
        created_on: (2024, 6, 28),
    },
    Row {
        name: "Flash Sale Banner",
        content_type: Image,
        status: MaterialStatus::Flagged,
        compliance: Compliance::Failed,
        prediction: LowQuality,
        violations: &[ViolationTag::CopyrightIssue],
        spend: 320.0,
        ctr: 1.2,
        uploader: "wang.wu",
        account: "client-e",
        created_on: (2024, 6, 30),
    },
    Row {
        name: "Customer Testimonial",
        content_type: Video,
        status: MaterialStatus::Approved,
        compliance: Compliance::Passed,
        prediction: HighQuality,
        violations: &[],
        spend: 1850.0,
        ctr: 5.1,
        uploader: "zhao.liu",
        account: "client-a",
        created_on: (2024, 7, 2),
    },
    Row {
        name: "Limited Time Offer",
        content_type: Text,
        status: MaterialStatus::Rejected,
        compliance: Compliance::Failed,
        prediction: LowQuality,
        violations: &[ViolationTag::FalseInformation, ViolationTag::MisleadingClaim],
        spend: 150.0,
        ctr: 0.5,
        uploader: "zhang.san",
        account: "client-f",
        created_on: (2024, 7, 5),
    },
    Row {
        name: "Product Comparison",
        content_type: Image,
        status: MaterialStatus::Testing,
        compliance: Compliance::Pending,
        prediction: MediumQuality,
        violations: &[],
        spend: 420.0,
        ctr: 2.3,
        uploader: "li.si",
        account: "client-g",
        created_on: (2024, 7, 8),
    },
    Row {
        name: "Short Video Ad",
        content_type: Video,
        status: MaterialStatus::Pending,
        compliance: Compliance::Pending,
        prediction: QualityPrediction::Pending,
        violations: &[],
        spend: 0.0,
        ctr: 0.0,
        uploader: "wang.wu",
        account: DEMO_VIDEO_ACCOUNT,
        created_on: (2024, 9, 1),
    },
    Row {
        name: "Livestream Teaser",
        content_type: Video,
        status: MaterialStatus::Approved,
        compliance: Compliance::Passed,
        prediction: HighQuality,
        violations: &[],
        spend: 3200.0,
        ctr: 5.8,
        uploader: "zhao.liu",
        account: DEMO_VIDEO_ACCOUNT,
        created_on: (2024, 9, 2),
    },
];

/// The demo catalog as validated records with ids `1..=12`.
pub fn demo_materials() -> Result<Vec<Material>, AuditError> {
    ROWS.iter()
        .enumerate()
        .map(|(index, row)| {
            let (y, m, d) = row.created_on;
            let created_on = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| {
                AuditError::internal(format!("invalid seed date {y}-{m}-{d}"))
            })?;
            let material = Material {
                id: MaterialId::from_sequence(index as u64 + 1),
                name: row.name.to_string(),
                content_type: row.content_type,
                status: row.status,
                compliance: row.compliance,
                prediction: row.prediction,
                violations: row.violations.to_vec(),
                spend: row.spend,
                ctr: row.ctr,
                account_id: row.account.to_string(),
                uploader: row.uploader.to_string(),
                created_on,
                task_id: None,
            };
            material.validate()?;
            Ok(material)
        })
        .collect()
}

/// Load the demo catalog into `state`. Returns the number of records loaded.
pub fn load_demo_materials(state: &mut AuditState) -> Result<usize, AuditError> {
    let materials = demo_materials()?;
    let count = materials.len();
    for material in materials {
        state.upsert_material(material)?;
    }
    tracing::debug!(count, "Loaded demo material catalog");
    Ok(count)
}
