//! Plan documents: model, content heuristics, frontmatter codec, storage.

pub mod detect;
pub mod frontmatter;
pub mod model;
pub mod store;

pub use detect::{detect_plan_type, extract_title_from_content};
pub use model::{NewPlan, Plan, PlanSummary, PlanType, PlanTypeParseError, PlanUpdate};
pub use store::{
    PLANS_DIR, PlanStoreError, delete_plan, list_plans, load_plan, plans_dir, save_plan,
    update_plan, validate_filename,
};
