//! Alias resolution against a seeded wiki.

use std::sync::Arc;

use doc_version_kernel::store::PageSeed;
use doc_version_kernel::types::{MANUALS_PAGE, VERSIONS_PAGE};
use doc_version_kernel::{
    ContentKey, DocsKernel, GroupAccessPolicy, InMemoryWiki, KernelConfig, RequestContext, Resolution,
    User, WikiSnapshot,
};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn page(key: impl Into<String>, content: &str, tags: &[&str]) -> PageSeed {
    PageSeed {
        key: key.into(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

async fn kernel(pages: Vec<PageSeed>) -> DocsKernel<InMemoryWiki> {
    let wiki = InMemoryWiki::from_snapshot(WikiSnapshot { pages });
    DocsKernel::load(
        Arc::new(wiki),
        Arc::new(GroupAccessPolicy::default()),
        KernelConfig::default(),
    )
    .await
    .unwrap()
}

fn foo_wiki() -> Vec<PageSeed> {
    vec![
        page(
            VERSIONS_PAGE,
            "{{#version:1.0|released}}\n{{#version:2.0|released}}\n{{#version:3.0|unreleased}}",
            &[],
        ),
        page(MANUALS_PAGE, "{{#manual:User|User Manual}}", &[]),
        page("Documentation:User:Foo:1.0", "one", &["V:1.0"]),
        page("Documentation:User:Foo:2.0", "two", &["V:2.0"]),
        page("Documentation:User:Foo:3.0", "three", &["V:3.0"]),
        page("Documentation:UserTOC2.0", "Basics\n* {{#topic:Foo}}", &["V:2.0"]),
    ]
}

fn employee() -> RequestContext {
    RequestContext::new(User::new("emp").with_group("employees"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Latest
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_latest_skips_versions_the_caller_cannot_see() {
    let k = kernel(foo_wiki()).await;
    let resolution = k
        .resolve(&RequestContext::anonymous(), "Documentation:User/latest/Foo")
        .await
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Concrete {
            key: ContentKey::topic("User", "Foo", "2.0"),
            version: "2.0".into()
        }
    );
}

#[tokio::test]
async fn test_preview_groups_see_unreleased_latest() {
    let k = kernel(foo_wiki()).await;
    let lenient = k.resolve(&employee(), "Documentation:User/latest/Foo").await.unwrap();
    assert_eq!(lenient.key(), Some(&ContentKey::topic("User", "Foo", "3.0")));

    // The strict form only serves released versions.
    let strict = k.resolve(&employee(), "Documentation/latest/User/Foo").await.unwrap();
    assert_eq!(strict.key(), Some(&ContentKey::topic("User", "Foo", "2.0")));
}

#[tokio::test]
async fn test_strict_latest_falls_back_when_latest_release_lacks_topic() {
    let mut pages = foo_wiki();
    pages.retain(|p| p.key != "Documentation:User:Foo:2.0");
    let k = kernel(pages).await;

    let resolution = k
        .resolve(&RequestContext::anonymous(), "Documentation/latest/User/Foo")
        .await
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Redirect {
            location: "/Special:LatestDoc?t=Documentation/latest/User/Foo".into()
        }
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Explicit versions and other forms
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hidden_explicit_version_differs_by_form() {
    let k = kernel(foo_wiki()).await;
    let ctx = RequestContext::anonymous();

    assert_eq!(
        k.resolve(&ctx, "Documentation:User/3.0/Foo").await.unwrap(),
        Resolution::Redirect {
            location: "/Documentation".into()
        }
    );
    assert_eq!(
        k.resolve(&ctx, "Documentation/3.0/User/Foo").await.unwrap(),
        Resolution::NotFound
    );
    assert_eq!(
        k.resolve(&ctx, "Documentation/7.0/User/Foo").await.unwrap(),
        Resolution::Redirect {
            location: "/Documentation".into()
        }
    );
}

#[tokio::test]
async fn test_concrete_and_landing_paths() {
    let k = kernel(foo_wiki()).await;
    let ctx = RequestContext::anonymous();

    assert_eq!(
        k.resolve(&ctx, "Documentation:User:Foo:1.0").await.unwrap().key(),
        Some(&ContentKey::topic("User", "Foo", "1.0"))
    );
    assert_eq!(
        k.resolve(&ctx, "Documentation:User:Foo:3.0").await.unwrap(),
        Resolution::NotFound
    );
    assert_eq!(
        k.resolve(&ctx, "Documentation/User").await.unwrap(),
        Resolution::Redirect {
            location: "/Documentation/2.0/User/Foo".into()
        }
    );
    assert_eq!(k.resolve(&ctx, "Main_Page").await.unwrap(), Resolution::NotFound);
}

#[tokio::test]
async fn test_navigation_lists_manuals_with_linked_tocs() {
    let k = kernel(foo_wiki()).await;
    let mut ctx = RequestContext::anonymous().with_selected_version("1.0");

    let nav = k.navigation(&mut ctx, "2.0").await.unwrap();
    assert_eq!(nav.len(), 1);
    assert_eq!(nav[0].first_url, "/Documentation/2.0/User/Foo");
    assert_eq!(ctx.selected_version(), Some("1.0"));

    assert!(k.navigation(&mut ctx, "1.0").await.unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

const STATUSES: [&str; 3] = ["released", "unreleased", "deprecated"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_latest_is_highest_visible_tagged_version(
        statuses in proptest::collection::vec(0usize..3, 5),
        tagged in proptest::collection::vec(any::<bool>(), 5),
        preview in any::<bool>(),
    ) {
        let names: Vec<String> = (1..=5).map(|i| format!("{}.0", i)).collect();
        let definition: String = names
            .iter()
            .zip(&statuses)
            .map(|(n, s)| format!("{{{{#version:{}|{}}}}}\n", n, STATUSES[*s]))
            .collect();

        let mut pages = vec![
            page(VERSIONS_PAGE, &definition, &[]),
            page(MANUALS_PAGE, "{{#manual:User|User Manual}}", &[]),
        ];
        for (name, _) in names.iter().zip(&tagged).filter(|(_, t)| **t) {
            let tag = format!("V:{}", name);
            pages.push(page(format!("Documentation:User:Foo:{}", name), "", &[tag.as_str()]));
        }

        let user = if preview { User::new("p").with_group("docteam") } else { User::new("r") };
        let expected = (0..5)
            .rev()
            .find(|&i| tagged[i] && (preview || STATUSES[statuses[i]] != "unreleased"))
            .map(|i| Resolution::Concrete {
                key: ContentKey::topic("User", "Foo", &names[i]),
                version: names[i].clone(),
            })
            .unwrap_or(Resolution::Redirect { location: "/Documentation".into() });

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let actual = runtime.block_on(async {
            let k = kernel(pages).await;
            k.resolve(&RequestContext::new(user), "Documentation:User:Foo").await.unwrap()
        });
        prop_assert_eq!(actual, expected);
    }
}
