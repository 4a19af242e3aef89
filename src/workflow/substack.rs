//! Substack publish choreography.
//!
//! Substack keeps the flow in one tab: the draft editor URL carries an edit
//! marker, and a successful publish redirects to the live post address.
//! Confirmation is therefore in-place URL polling. The publish flow is two
//! clicks, a continue trigger into the pre-publish screen and the final send
//! button; Substack has no tag token input in that dialog.

use crate::auth::{LoginFormProfile, SiteProfile};
use crate::types::Platform;
use crate::verify::FieldClass;
use crate::workflow::{
    ButtonTarget, ConfirmationMode, FieldTarget, LocatorStrategy, WorkflowPlan,
};

pub const SITE: SiteProfile = SiteProfile {
    root_url: "https://substack.com",
    cookie_domain: ".substack.com",
    logged_in_selectors: &[
        "[data-testid='user-menu']",
        ".reader-nav-avatar",
        "a[href*='/settings']",
    ],
    user_handle_selectors: &["[data-testid='user-menu-name']", ".user-name"],
    login: LoginFormProfile {
        login_url: "https://substack.com/sign-in",
        email_selector: "input[type='email']",
        continue_keywords: &["sign in with password"],
        password_selector: "input[type='password']",
        submit_keywords: &["continue", "sign in"],
        form_scope: "form",
        logged_in_url_markers: &["/home", "/inbox"],
    },
};

pub fn plan() -> WorkflowPlan {
    WorkflowPlan {
        platform: Platform::Substack,
        site: SITE,
        editor_url: "https://substack.com/publish/post",
        editor_selectors: &[
            "textarea[placeholder='Title']",
            "[data-testid='post-title']",
            ".page-editor",
        ],
        title: FieldTarget {
            name: "fill-title",
            class: FieldClass::Title,
            strategies: &[
                LocatorStrategy::Css("textarea[placeholder='Title']"),
                LocatorStrategy::Heuristic(&["title"]),
                LocatorStrategy::BroadScan(0),
            ],
        },
        body: FieldTarget {
            name: "fill-body",
            class: FieldClass::Body,
            strategies: &[
                LocatorStrategy::Css("[data-testid='editor'] [contenteditable='true']"),
                LocatorStrategy::Heuristic(&["start writing", "body", "write"]),
                LocatorStrategy::BroadScan(1),
            ],
        },
        body_surface: "[data-testid='editor'] [contenteditable='true']",
        trigger: ButtonTarget {
            name: "publish-trigger",
            keywords: &["continue", "publish"],
            disqualifiers: &["schedule", "draft", "test"],
            scope: "header, .publish-bar",
        },
        tags: None,
        confirm: ButtonTarget {
            name: "publish-confirm",
            keywords: &["send to everyone now", "publish now", "send now"],
            disqualifiers: &["schedule", "test", "draft"],
            scope: "[role='dialog'], .pre-publish",
        },
        confirmation: ConfirmationMode::InPlace {
            draft_marker: "/edit",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_sheds_the_edit_marker() {
        let plan = plan();
        match plan.confirmation {
            ConfirmationMode::InPlace { draft_marker } => assert_eq!(draft_marker, "/edit"),
            ConfirmationMode::NewTab => panic!("substack confirms in place"),
        }
    }

    #[test]
    fn test_sends_are_disqualified() {
        let plan = plan();
        assert!(plan.confirm.disqualifiers.contains(&"test"));
    }
}
