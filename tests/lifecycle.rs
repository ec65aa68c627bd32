//! Request lifecycle tests on the in-memory store

mod common;

use chrono::Duration;

use common::{request, request_input, workshop, Workshop};
use gearguard_server::{
    error::AppError,
    models::request::{CreateRequest, RequestStatus, RequestType, UpdateRequest},
};

#[tokio::test]
async fn walkthrough_from_creation_to_scrap() {
    let Workshop {
        services,
        team,
        member,
        outsider,
        equipment,
    } = workshop().await;

    let created = request(&services, "Oil leak", equipment, RequestType::Corrective).await;
    assert_eq!(created.team, Some(team));
    assert_eq!(created.team_name.as_deref(), Some("Mechanics"));
    assert_eq!(created.status, RequestStatus::New);
    assert_eq!(created.technician, None);

    let assigned = services.requests.assign_technician(created.id, member).await.unwrap();
    assert_eq!(assigned.technician, Some(member));
    assert_eq!(assigned.technician_name.as_deref(), Some("Alice Martin"));

    let err = services
        .requests
        .assign_technician(created.id, outsider)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::TechnicianNotInTeam { technician, team: Some(t) } if technician == outsider && t == team
    ));
    let unchanged = services.requests.get(created.id).await.unwrap();
    assert_eq!(unchanged.technician, Some(member));

    let started = services
        .requests
        .update_status(created.id, RequestStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(started.status, RequestStatus::InProgress);

    let err = services
        .requests
        .update_status(created.id, RequestStatus::New)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: RequestStatus::InProgress,
            to: RequestStatus::New
        }
    ));

    let scrapped = services
        .requests
        .update_status(created.id, RequestStatus::Scrap)
        .await
        .unwrap();
    assert_eq!(scrapped.status, RequestStatus::Scrap);
    assert!(!services.equipment.get_by_id(equipment).await.unwrap().is_usable);
}

#[tokio::test]
async fn every_pair_outside_the_table_is_rejected() {
    let Workshop { services, equipment, .. } = workshop().await;

    // Walks needed to reach each status from NEW
    let paths: [(RequestStatus, &[RequestStatus]); 4] = [
        (RequestStatus::New, &[]),
        (RequestStatus::InProgress, &[RequestStatus::InProgress]),
        (RequestStatus::Repaired, &[RequestStatus::InProgress, RequestStatus::Repaired]),
        (RequestStatus::Scrap, &[RequestStatus::InProgress, RequestStatus::Scrap]),
    ];

    for (from, path) in paths {
        for to in RequestStatus::ALL {
            if to == from || from.can_transition_to(to) {
                continue;
            }
            let created = request(&services, "Check", equipment, RequestType::Corrective).await;
            for &step in path {
                services.requests.update_status(created.id, step).await.unwrap();
            }

            let err = services.requests.update_status(created.id, to).await.unwrap_err();
            assert!(
                matches!(err, AppError::InvalidTransition { from: f, to: t } if f == from && t == to),
                "{} -> {} should be rejected",
                from,
                to
            );
            assert_eq!(services.requests.get(created.id).await.unwrap().status, from);
        }
    }
}

#[tokio::test]
async fn same_status_is_accepted_without_side_effects() {
    let Workshop { services, equipment, .. } = workshop().await;
    let created = request(&services, "Belt check", equipment, RequestType::Corrective).await;

    for status in [RequestStatus::New, RequestStatus::InProgress, RequestStatus::Repaired] {
        if status != RequestStatus::New {
            services.requests.update_status(created.id, status).await.unwrap();
        }
        let before = services.requests.get(created.id).await.unwrap();
        let after = services.requests.update_status(created.id, status).await.unwrap();
        assert_eq!(after.status, status);
        assert_eq!(after.updated_at, before.updated_at);
    }
    assert!(services.equipment.get_by_id(equipment).await.unwrap().is_usable);
}

#[tokio::test]
async fn scrap_from_repaired_retires_equipment() {
    let Workshop { services, equipment, .. } = workshop().await;
    let created = request(&services, "Motor swap", equipment, RequestType::Corrective).await;

    for status in [RequestStatus::InProgress, RequestStatus::Repaired] {
        services.requests.update_status(created.id, status).await.unwrap();
    }
    assert!(services.equipment.get_by_id(equipment).await.unwrap().is_usable);

    services
        .requests
        .update_status(created.id, RequestStatus::Scrap)
        .await
        .unwrap();
    assert!(!services.equipment.get_by_id(equipment).await.unwrap().is_usable);
}

#[tokio::test]
async fn explicit_team_overrides_equipment_default() {
    let Workshop {
        services,
        outsider,
        equipment,
        ..
    } = workshop().await;
    let electricians = common::team(&services, "Electricians", &[outsider]).await;

    let created = services
        .requests
        .create(&CreateRequest {
            team: Some(electricians.id),
            technician: Some(outsider),
            ..request_input("Rewire panel", equipment)
        })
        .await
        .unwrap();
    assert_eq!(created.team, Some(electricians.id));
    assert_eq!(created.technician, Some(outsider));
}

#[tokio::test]
async fn create_rejects_technician_outside_resolved_team() {
    let Workshop {
        services,
        outsider,
        equipment,
        ..
    } = workshop().await;

    let err = services
        .requests
        .create(&CreateRequest {
            technician: Some(outsider),
            ..request_input("Noise", equipment)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TechnicianNotInTeam { .. }));
    assert!(services.requests.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_with_technician_but_no_team_is_rejected() {
    let Workshop { services, member, .. } = workshop().await;
    let loose = common::equipment(&services, "Forklift", "FL-9", None).await;

    let err = services
        .requests
        .create(&CreateRequest {
            technician: Some(member),
            ..request_input("Brakes", loose.id)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TechnicianNotInTeam { team: None, .. }));
}

#[tokio::test]
async fn create_on_missing_equipment_is_not_found() {
    let Workshop { services, .. } = workshop().await;
    let err = services
        .requests
        .create(&request_input("Ghost", 9999))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn assignment_without_team_accepts_anyone() {
    let Workshop { services, outsider, .. } = workshop().await;
    let loose = common::equipment(&services, "Forklift", "FL-9", None).await;
    let created = request(&services, "Tyres", loose.id, RequestType::Corrective).await;
    assert_eq!(created.team, None);

    let assigned = services.requests.assign_technician(created.id, outsider).await.unwrap();
    assert_eq!(assigned.technician, Some(outsider));
    assert_eq!(assigned.status, RequestStatus::New);
}

#[tokio::test]
async fn general_update_shares_transition_and_membership_checks() {
    let Workshop {
        services,
        member,
        outsider,
        equipment,
        ..
    } = workshop().await;
    let created = request(&services, "Valve", equipment, RequestType::Corrective).await;

    let err = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                status: Some(RequestStatus::Repaired),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let err = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                technician: Some(Some(outsider)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TechnicianNotInTeam { .. }));

    // Rejected edits leave no partial writes behind
    let err = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                subject: Some("Valve replaced".to_string()),
                technician: Some(Some(outsider)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TechnicianNotInTeam { .. }));
    assert_eq!(services.requests.get(created.id).await.unwrap().subject, "Valve");

    let updated = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                subject: Some("Valve replaced".to_string()),
                technician: Some(Some(member)),
                status: Some(RequestStatus::InProgress),
                duration: Some(Some(Duration::minutes(90))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.subject, "Valve replaced");
    assert_eq!(updated.technician, Some(member));
    assert_eq!(updated.status, RequestStatus::InProgress);
    assert_eq!(updated.duration, Some(Duration::minutes(90)));
}

#[tokio::test]
async fn switching_team_requires_the_technician_to_follow() {
    let Workshop {
        services,
        member,
        outsider,
        equipment,
        ..
    } = workshop().await;
    let electricians = common::team(&services, "Electricians", &[outsider]).await;
    let created = request(&services, "Sparks", equipment, RequestType::Corrective).await;
    services.requests.assign_technician(created.id, member).await.unwrap();

    let err = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                team: Some(Some(electricians.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TechnicianNotInTeam { .. }));

    let moved = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                team: Some(Some(electricians.id)),
                technician: Some(Some(outsider)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.team, Some(electricians.id));
    assert_eq!(moved.technician, Some(outsider));
}

#[tokio::test]
async fn clearing_the_technician_is_allowed() {
    let Workshop {
        services,
        member,
        equipment,
        ..
    } = workshop().await;
    let created = request(&services, "Filter", equipment, RequestType::Corrective).await;
    services.requests.assign_technician(created.id, member).await.unwrap();

    let cleared = services
        .requests
        .update(
            created.id,
            &UpdateRequest {
                technician: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.technician, None);
    assert_eq!(cleared.technician_name, None);
}

#[tokio::test]
async fn concurrent_status_updates_agree_with_equipment_usability() {
    let Workshop { services, equipment, .. } = workshop().await;
    let created = request(&services, "Crack in frame", equipment, RequestType::Corrective).await;
    services
        .requests
        .update_status(created.id, RequestStatus::InProgress)
        .await
        .unwrap();

    let scrap = {
        let services = services.clone();
        tokio::spawn(async move { services.requests.update_status(created.id, RequestStatus::Scrap).await })
    };
    let repair = {
        let services = services.clone();
        tokio::spawn(async move { services.requests.update_status(created.id, RequestStatus::Repaired).await })
    };
    let scrap = scrap.await.unwrap();
    let repair = repair.await.unwrap();

    let final_request = services.requests.get(created.id).await.unwrap();
    let usable = services.equipment.get_by_id(equipment).await.unwrap().is_usable;

    // Scrap always succeeds (directly, or after REPAIRED); the repair may lose the race
    assert!(scrap.is_ok());
    assert_eq!(final_request.status, RequestStatus::Scrap);
    assert!(!usable);
    if let Err(err) = repair {
        assert!(matches!(err, AppError::InvalidTransition { .. } | AppError::Conflict(_)));
    }
}

#[tokio::test]
async fn deleting_a_request_removes_it() {
    let Workshop { services, equipment, .. } = workshop().await;
    let created = request(&services, "Temporary", equipment, RequestType::Corrective).await;

    services.requests.delete(created.id).await.unwrap();
    assert!(matches!(
        services.requests.get(created.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        services.requests.delete(created.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn equipment_request_listing_filters_by_equipment() {
    let Workshop { services, equipment, .. } = workshop().await;
    let other = common::equipment(&services, "Drill", "DR-2", None).await;
    request(&services, "Press 1", equipment, RequestType::Corrective).await;
    request(&services, "Press 2", equipment, RequestType::Preventive).await;
    request(&services, "Drill 1", other.id, RequestType::Corrective).await;

    let listed = services.requests.list_for_equipment(equipment).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|r| r.equipment == equipment));
    assert!(listed.iter().all(|r| r.equipment_name.as_deref() == Some("Hydraulic press")));

    assert!(matches!(
        services.requests.list_for_equipment(4242).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn calendar_lists_only_preventive_requests() {
    let Workshop {
        services,
        member,
        equipment,
        ..
    } = workshop().await;
    request(&services, "Breakdown", equipment, RequestType::Corrective).await;
    let plain = request(&services, "Grease", equipment, RequestType::Preventive).await;
    let timed = services
        .requests
        .create(&CreateRequest {
            request_type: Some(RequestType::Preventive),
            technician: Some(member),
            duration: Some(Duration::minutes(45)),
            ..request_input("Inspect seals", equipment)
        })
        .await
        .unwrap();

    let mut events = services.calendar.events().await.unwrap();
    events.sort_by_key(|e| e.id);
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].id, plain.id);
    assert_eq!(events[0].end, common::start() + Duration::hours(1));
    assert_eq!(events[0].technician, "Unassigned");
    assert_eq!(events[0].equipment, "Hydraulic press");

    assert_eq!(events[1].id, timed.id);
    assert_eq!(events[1].end, common::start() + Duration::minutes(45));
    assert_eq!(events[1].technician, "Alice Martin");
}
