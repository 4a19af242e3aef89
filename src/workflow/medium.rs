//! Medium publish choreography.
//!
//! Medium's editor confirms a publish by opening the live story in a new
//! tab, so the plan uses new-tab confirmation. The publish trigger lives in
//! the page header; scheduling and draft controls share its keyword, hence
//! the disqualifier list. Tags are entered inside the publish dialog.

use crate::auth::{LoginFormProfile, SiteProfile};
use crate::types::Platform;
use crate::verify::FieldClass;
use crate::workflow::{
    ButtonTarget, ConfirmationMode, FieldTarget, LocatorStrategy, TagTarget, WorkflowPlan,
};

pub const SITE: SiteProfile = SiteProfile {
    root_url: "https://medium.com",
    cookie_domain: ".medium.com",
    logged_in_selectors: &[
        "[data-testid='headerAvatar']",
        "img[alt='avatar']",
        "a[href*='/me/']",
    ],
    user_handle_selectors: &[
        "[data-testid='headerUserName']",
        "[data-testid='authorName']",
    ],
    login: LoginFormProfile {
        login_url: "https://medium.com/m/signin",
        email_selector: "input[type='email']",
        continue_keywords: &["continue"],
        password_selector: "input[type='password']",
        submit_keywords: &["sign in"],
        form_scope: "form",
        logged_in_url_markers: &["medium.com/?", "/home"],
    },
};

pub fn plan() -> WorkflowPlan {
    WorkflowPlan {
        platform: Platform::Medium,
        site: SITE,
        editor_url: "https://medium.com/new-story",
        editor_selectors: &[
            "h3[data-testid='editorTitleParagraph']",
            "article [contenteditable='true']",
            "section[data-field='body']",
        ],
        title: FieldTarget {
            name: "fill-title",
            class: FieldClass::Title,
            strategies: &[
                LocatorStrategy::Css("h3[data-testid='editorTitleParagraph']"),
                LocatorStrategy::Heuristic(&["title", "headline"]),
                LocatorStrategy::BroadScan(0),
            ],
        },
        body: FieldTarget {
            name: "fill-body",
            class: FieldClass::Body,
            strategies: &[
                LocatorStrategy::Css("p[data-testid='editorParagraphText']"),
                LocatorStrategy::Heuristic(&["story", "tell your story", "body"]),
                LocatorStrategy::BroadScan(1),
            ],
        },
        body_surface: "article [contenteditable='true']",
        trigger: ButtonTarget {
            name: "publish-trigger",
            keywords: &["publish"],
            disqualifiers: &["schedule", "draft", "unpublish"],
            scope: "header, nav",
        },
        tags: Some(TagTarget {
            selector: "[data-testid='publishTags'] input, .js-tagInput input",
        }),
        confirm: ButtonTarget {
            name: "publish-confirm",
            keywords: &["publish now", "publish"],
            disqualifiers: &["schedule", "draft"],
            scope: "[role='dialog'], [data-testid='publishConfirmation']",
        },
        confirmation: ConfirmationMode::NewTab,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_never_matches_schedule_controls() {
        let plan = plan();
        assert!(plan.confirm.disqualifiers.contains(&"schedule"));
        assert!(plan.trigger.disqualifiers.contains(&"draft"));
    }

    #[test]
    fn field_targets_end_with_a_broad_scan_fallback() {
        let plan = plan();
        assert!(matches!(
            plan.title.strategies.last(),
            Some(LocatorStrategy::BroadScan(0))
        ));
        assert!(matches!(
            plan.body.strategies.last(),
            Some(LocatorStrategy::BroadScan(1))
        ));
    }
}
