use familytree_core::db::open_db_in_memory;
use familytree_core::{
    ActingContext, Family, FamilyLink, FamilyRepoError, FamilyRepoResult, FamilyRepository,
    FamilyService, JoinIdOwner, LinkFailure, LinkFlow, LinkService, Member,
    SqliteFamilyRepository,
};
use rusqlite::Connection;
use std::collections::HashSet;

struct Seeded {
    bello: Family,
    okafor: Family,
}

fn person(id: &str, first: &str, last: &str, relationship: &str, join_id: &str) -> Member {
    let mut member = Member::new(id, relationship, "1980").with_names(first, last);
    member.join_id = join_id.to_string();
    member
}

fn seed(conn: &Connection) -> Seeded {
    let repo = SqliteFamilyRepository::try_new(conn).unwrap();
    let service = FamilyService::new(repo);

    let bello = service
        .create_family("Bello", person("b-f", "Musa", "Bello", "Father", "MUSA001"))
        .unwrap();
    service
        .add_member(
            bello.id.as_str(),
            person("b-m1", "Amina", "Bello", "Wife1", "AMINA002"),
        )
        .unwrap();
    service
        .add_member(
            bello.id.as_str(),
            person("b-c1", "Sani", "Bello", "Son", "SANI003").with_mother("b-m1"),
        )
        .unwrap();

    let okafor = service
        .create_family("Okafor", person("o-f", "Tunde", "Okafor", "Father", "TUNDE004"))
        .unwrap();
    service
        .add_member(
            okafor.id.as_str(),
            person("o-c1", "Ada", "Okafor", "Daughter", "ADA005"),
        )
        .unwrap();

    Seeded { bello, okafor }
}

fn bello_creator(seeded: &Seeded) -> ActingContext {
    ActingContext::new(seeded.bello.id.as_str(), "b-f")
}

#[test]
fn validate_accepts_foreign_token_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let repo = SqliteFamilyRepository::try_new(&conn).unwrap();
    let links = LinkService::new(repo);

    let first = links.validate_join_id("  TUNDE004 ", &bello_creator(&seeded));
    assert!(first.is_valid);
    assert_eq!(first.member_name.as_deref(), Some("Tunde Okafor"));
    assert_eq!(first.family_name.as_deref(), Some("Okafor"));
    assert!(first.is_family_creator);
    assert!(first.message.contains("Okafor"));
    assert!(first.failure.is_none());

    let second = links.validate_join_id("TUNDE004", &bello_creator(&seeded));
    assert_eq!(first, second);

    assert!(repo.list_links(seeded.bello.id.as_str()).unwrap().is_empty());
    let owner = repo.find_join_id_owner("TUNDE004").unwrap().unwrap();
    assert!(!owner.member.join_id_used);
}

#[test]
fn validate_accepts_token_of_non_creator_holder() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let links = LinkService::new(SqliteFamilyRepository::try_new(&conn).unwrap());

    let result = links.validate_join_id("ADA005", &bello_creator(&seeded));
    assert!(result.is_valid);
    assert!(!result.is_family_creator);
}

#[test]
fn validate_rejects_each_precondition_with_its_own_message() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let links = LinkService::new(SqliteFamilyRepository::try_new(&conn).unwrap());
    let acting = bello_creator(&seeded);

    let cases = [
        ("   ", acting.clone(), LinkFailure::EmptyToken),
        ("NOBODY999", acting.clone(), LinkFailure::TokenNotFound),
        ("tunde004", acting.clone(), LinkFailure::TokenNotFound),
        ("AMINA002", acting.clone(), LinkFailure::OwnFamily),
        (
            "TUNDE004",
            ActingContext::new("missing-family", "b-f"),
            LinkFailure::ActingFamilyNotFound,
        ),
        (
            "TUNDE004",
            ActingContext::new(seeded.bello.id.as_str(), "o-f"),
            LinkFailure::ActingMemberNotFound,
        ),
        (
            "TUNDE004",
            ActingContext::new(seeded.bello.id.as_str(), "b-m1"),
            LinkFailure::NotFamilyCreator,
        ),
    ];

    let mut messages = HashSet::new();
    for (token, acting, expected) in cases {
        let result = links.validate_join_id(token, &acting);
        assert!(!result.is_valid, "token {token:?}");
        assert_eq!(result.failure.as_ref(), Some(&expected), "token {token:?}");
        assert_eq!(result.message, expected.to_string());
        messages.insert(result.message);
    }
    assert_eq!(messages.len(), 6);
}

#[test]
fn non_creator_cannot_link() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let repo = SqliteFamilyRepository::try_new(&conn).unwrap();
    let links = LinkService::new(repo);

    let acting = ActingContext::new(seeded.bello.id.as_str(), "b-m1");
    let result = links.link_family("TUNDE004", &acting);
    assert!(!result.success);
    assert_eq!(result.failure, Some(LinkFailure::NotFamilyCreator));
    assert!(repo.list_links(seeded.bello.id.as_str()).unwrap().is_empty());
}

#[test]
fn link_records_once_and_marks_token_used() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let repo = SqliteFamilyRepository::try_new(&conn).unwrap();
    let links = LinkService::new(repo);

    let result = links.link_family("TUNDE004", &bello_creator(&seeded));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Successfully linked with the Okafor family.");
    assert_eq!(result.linked_members_count, 2);
    let summary = result.linked_family.unwrap();
    assert_eq!(summary.id, seeded.okafor.id);
    assert_eq!(summary.name, "Okafor");

    let stored = repo.list_links(seeded.okafor.id.as_str()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].family_id, seeded.bello.id);
    assert_eq!(stored[0].linked_by, "b-f");
    assert_eq!(stored[0].join_id, "TUNDE004");

    let owner = repo.find_join_id_owner("TUNDE004").unwrap().unwrap();
    assert!(owner.member.join_id_used);
}

#[test]
fn second_link_is_rejected_in_both_directions() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let repo = SqliteFamilyRepository::try_new(&conn).unwrap();
    let links = LinkService::new(repo);

    assert!(links.link_family("TUNDE004", &bello_creator(&seeded)).success);

    let again = links.link_family("ADA005", &bello_creator(&seeded));
    assert!(!again.success);
    assert_eq!(
        again.message,
        "Your family is already linked with the Okafor family."
    );

    let okafor_creator = ActingContext::new(seeded.okafor.id.as_str(), "o-f");
    let reverse = links.link_family("MUSA001", &okafor_creator);
    assert!(matches!(
        reverse.failure,
        Some(LinkFailure::AlreadyLinked { ref family_name }) if family_name == "Bello"
    ));

    let validation = links.validate_join_id("TUNDE004", &bello_creator(&seeded));
    assert!(!validation.is_valid);
    assert_eq!(validation.family_name.as_deref(), Some("Okafor"));

    assert_eq!(repo.list_links(seeded.bello.id.as_str()).unwrap().len(), 1);

    let combined = links.combined_members(seeded.bello.id.as_str()).unwrap();
    let ids = combined.iter().map(|m| m.id.as_str()).collect::<HashSet<_>>();
    assert_eq!(ids.len(), combined.len());
    assert_eq!(combined.len(), 5);
}

#[test]
fn combined_view_decorates_linked_members_for_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let links = LinkService::new(SqliteFamilyRepository::try_new(&conn).unwrap());
    links.link_family("TUNDE004", &bello_creator(&seeded));

    let bello_view = links.combined_members(seeded.bello.id.as_str()).unwrap();
    let order = bello_view.iter().map(|m| m.id.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["b-f", "b-m1", "b-c1", "o-f", "o-c1"]);
    for member in &bello_view[..3] {
        assert_eq!(member.is_linked_member, Some(false));
        assert!(member.source_family.is_none());
    }
    for member in &bello_view[3..] {
        assert!(member.is_linked());
        assert_eq!(member.source_family.as_deref(), Some("Okafor"));
    }

    let okafor_view = links.combined_members(seeded.okafor.id.as_str()).unwrap();
    assert_eq!(okafor_view.len(), 5);
    assert_eq!(okafor_view[0].id, "o-f");
    assert!(okafor_view[2..]
        .iter()
        .all(|m| m.source_family.as_deref() == Some("Bello")));
}

#[test]
fn family_view_after_link_counts_linked_members() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let repo = SqliteFamilyRepository::try_new(&conn).unwrap();
    LinkService::new(repo).link_family("TUNDE004", &bello_creator(&seeded));

    let view = FamilyService::new(repo)
        .family_view(seeded.bello.id.as_str(), 1024.0, 768.0)
        .unwrap();
    assert_eq!(view.members.len(), 5);
    assert_eq!(view.statistics.linked_members, 2);
    assert_eq!(view.family.linked_family_ids(), vec![seeded.okafor.id.as_str()]);
    assert_eq!(view.tree.id, "b-f");
    assert!(view.tree.find("b-c1").is_some());
}

#[test]
fn last_validation_request_wins_before_link() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn);
    let links = LinkService::new(SqliteFamilyRepository::try_new(&conn).unwrap());
    let acting = bello_creator(&seeded);
    let mut flow = LinkFlow::new();

    let stale = flow.begin_validation("AMINA002");
    let latest = flow.begin_validation("TUNDE004");

    let latest_result = links.validate_join_id(latest.token(), &acting);
    assert!(flow.complete_validation(latest, latest_result).is_some());

    let stale_result = links.validate_join_id(stale.token(), &acting);
    assert!(flow.complete_validation(stale, stale_result).is_none());

    assert!(flow.ready_to_link("TUNDE004"));
    assert!(links.link_family("TUNDE004", &acting).success);
    flow.reset();
    assert!(!flow.ready_to_link("TUNDE004"));
}

struct OfflineRepository;

fn offline<T>() -> FamilyRepoResult<T> {
    Err(FamilyRepoError::InvalidData("backend offline".to_string()))
}

impl FamilyRepository for OfflineRepository {
    fn create_family(&self, _family: &Family) -> FamilyRepoResult<()> {
        offline()
    }

    fn add_member(&self, _family_id: &str, _member: &Member) -> FamilyRepoResult<()> {
        offline()
    }

    fn get_family(&self, _family_id: &str) -> FamilyRepoResult<Option<Family>> {
        offline()
    }

    fn list_members(&self, _family_id: &str) -> FamilyRepoResult<Vec<Member>> {
        offline()
    }

    fn find_join_id_owner(&self, _join_id: &str) -> FamilyRepoResult<Option<JoinIdOwner>> {
        offline()
    }

    fn list_links(&self, _family_id: &str) -> FamilyRepoResult<Vec<FamilyLink>> {
        offline()
    }

    fn record_link(&self, _link: &FamilyLink) -> FamilyRepoResult<()> {
        offline()
    }

    fn count_members(&self) -> FamilyRepoResult<usize> {
        offline()
    }

    fn join_id_exists(&self, _join_id: &str) -> FamilyRepoResult<bool> {
        offline()
    }
}

#[test]
fn transport_failure_returns_generic_message() {
    let links = LinkService::new(OfflineRepository);
    let acting = ActingContext::new("any", "any");

    let validation = links.validate_join_id("TUNDE004", &acting);
    assert!(!validation.is_valid);
    assert_eq!(validation.failure, Some(LinkFailure::Unavailable));
    assert_eq!(validation.message, LinkFailure::Unavailable.to_string());
    assert!(!validation.message.contains("offline"));

    let result = links.link_family("TUNDE004", &acting);
    assert!(!result.success);
    assert_eq!(result.failure, Some(LinkFailure::Unavailable));
    assert_eq!(result.linked_members_count, 0);
}
