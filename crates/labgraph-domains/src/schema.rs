//! Column names of the record store, grouped by table.
//!
//! Prefixes follow the store's convention: `*_pk` is a table's own primary
//! key, `*_fk_*` a reference to another table, `*_cf_*` a custom field.

pub mod template {
    pub const NAME: &str = "xptm_name";
}

pub mod content_type {
    pub const NAME: &str = "cntp_name";
}

pub mod run {
    pub const NAME: &str = "xprn_name";
    pub const FK_TEMPLATE: &str = "xprn_fk_experimentTemplate";
    pub const CREATED_ON: &str = "xprn_createdOn";
    pub const CREATED_BY: &str = "xprn_createdBy";
}

pub mod step {
    pub const NAME: &str = "xprs_name";
    pub const FK_RUN: &str = "xprs_fk_experimentRun";
    pub const CREATED_BY: &str = "xprs_createdBy";
    pub const FK_PROTOCOL: &str = "xprs_cf_fk_protocol";
    pub const FK_REAGENTS: &str = "xprs_cf_fk_reagents";
    pub const WASH_TYPE: &str = "xprs_cf_washType";
    pub const START_TIME: &str = "xprs_cf_startTime";
    pub const END_TIME: &str = "xprs_cf_endTime";
    pub const MASS: &str = "xprs_cf_mass";
}

pub mod step_content {
    pub const FK_STEP: &str = "xrsc_fk_experimentRunStep";
    pub const FK_CONTENT: &str = "xrsc_fk_content";
}

pub mod content {
    pub const PK: &str = "cntn_pk";
    pub const ID: &str = "cntn_id";
    pub const BARCODE: &str = "cntn_barCode";
    pub const FK_CONTENT_TYPE: &str = "cntn_fk_contentType";
    pub const CREATED_ON: &str = "cntn_createdOn";
    pub const SOURCE: &str = "cntn_cf_source";
    pub const LOT_NUMBER: &str = "cntn_cf_lotNumber";
    pub const INTENDED_SUBJECT_ID: &str = "cntn_cf_intendedSubjectId";
    pub const VOLUME: &str = "cntn_cf_volume";
    pub const CONCENTRATION: &str = "cntn_cf_concentration";
    pub const DATE_MADE: &str = "cntn_cf_dateMade";
    pub const PREP_LOT: &str = "cntn_cf_prepLotNumber";
    pub const MATERIAL_TYPE: &str = "cntn_cf_materialType";
    pub const FK_VIRAL_MATERIALS: &str = "cntn_cf_fk_viralMaterials";
    pub const FK_PLASMIDS: &str = "cntn_cf_fk_plasmids";
}

pub mod result {
    pub const FK_STEP: &str = "rslt_fk_experimentRunStep";
    pub const FK_CONTENT: &str = "rslt_fk_content";
    pub const FK_TEST: &str = "rslt_fk_test";
    pub const VALUE: &str = "rslt_value";

    // Session results
    pub const SESSION_NAME: &str = "rslt_cf_sessionName";
    pub const SESSION_TYPE: &str = "rslt_cf_sessionType";
    pub const START_TIME: &str = "rslt_cf_startTime";
    pub const END_TIME: &str = "rslt_cf_endTime";
    pub const RIG_ID: &str = "rslt_cf_rigId";
    pub const REWARD_CONSUMED: &str = "rslt_cf_rewardConsumedMl";
    pub const ACTIVE_MOUSE_PLATFORM: &str = "rslt_cf_activeMousePlatform";
    pub const FK_REWARD_SPOUTS: &str = "rslt_cf_fk_rewardSpouts";
    pub const FK_MOUSE_PLATFORM: &str = "rslt_cf_fk_mousePlatform";

    // Weight results
    pub const WEIGHT_PRIOR: &str = "rslt_cf_weightPrior";
    pub const WEIGHT_POST: &str = "rslt_cf_weightPost";

    // Stream module results
    pub const FK_PROBE: &str = "rslt_cf_fk_probe";
    pub const ARC_ANGLE: &str = "rslt_cf_arcAngle";
    pub const MODULE_ANGLE: &str = "rslt_cf_moduleAngle";
    pub const ROTATION_ANGLE: &str = "rslt_cf_rotationAngle";

    // Imaging results
    pub const FK_INSTRUMENT: &str = "rslt_cf_fk_instrument";
    pub const IMMERSION_MEDIUM: &str = "rslt_cf_chamberImmersionMedium";
    pub const REFRACTIVE_INDEX: &str = "rslt_cf_chamberRefractiveIndex";
    pub const BRAIN_ORIENTATION: &str = "rslt_cf_brainOrientation";
    pub const LASER_WAVELENGTHS: &str = "rslt_cf_laserWavelengths";

    // Water restriction results
    pub const BASELINE_WEIGHT: &str = "rslt_cf_baselineWeight";
    pub const TARGET_FRACTION: &str = "rslt_cf_targetWeightFraction";
    pub const MINIMUM_WATER: &str = "rslt_cf_minimumWaterMl";
}

pub mod reference {
    pub const PK: &str = "rdrc_pk";
    pub const NAME: &str = "rdrc_name";
    pub const FK_TYPE: &str = "rdrc_fk_referenceDataType";
    pub const SIDE: &str = "rdrc_cf_side";
    pub const SPOUT_DIAMETER: &str = "rdrc_cf_spoutDiameter";
    pub const SOLUTION: &str = "rdrc_cf_solution";
}

pub mod sop {
    pub const PK: &str = "sop_pk";
    pub const NAME: &str = "sop_name";
    pub const LINK: &str = "sop_cf_link";
}

pub mod instrument {
    pub const PK: &str = "nstr_pk";
    pub const NAME: &str = "nstr_name";
}

/// Content-type labels (`cntn_fk_contentType` display values).
pub mod kinds {
    pub const MOUSE: &str = "Mouse";
    pub const REAGENT: &str = "Reagent";
    pub const VIRAL_MATERIAL: &str = "Viral Material";
    pub const VIRAL_INJECTION: &str = "Viral Injection";
    pub const PLASMID: &str = "Plasmid";
}

/// Test labels (`rslt_fk_test` display values) that tell Result rows apart.
pub mod test_labels {
    pub const MOUSE_SESSION: &str = "Mouse Session";
    pub const MOUSE_WEIGHT: &str = "Mouse Weight";
    pub const STREAM_MODULE: &str = "Stream Module";
    pub const SPIM_IMAGING: &str = "SPIM Imaging";
    pub const WATER_RESTRICTION: &str = "Water Restriction";
    pub const TITER: &str = "Titer";
}

/// Reference-data type labels (`rdrc_fk_referenceDataType` display values).
pub mod reference_kinds {
    pub const REWARD_SPOUT: &str = "Reward Spout";
    pub const MOUSE_PLATFORM: &str = "Mouse Platform";
}
