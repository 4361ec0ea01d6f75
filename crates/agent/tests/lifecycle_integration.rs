//! End-to-end lifecycle: seed an agent with calls, knowledge, and an
//! integration, then verify the cascade delete removes every dependent
//! record and reports exact per-table counts.

use std::sync::Arc;

use serde_json::json;

use vaani_agent::{AgentLifecycle, CreateAgentRequest};
use vaani_core::{
    now_ms, CallInteraction, CallSession, CallType, ChunkRecord, Document, Integration,
    IntegrationStatus, InteractionType, SessionStatus, TriggerType,
};
use vaani_persistence::PersistenceLayer;
use vaani_rag::{AddRequest, HashEmbedder, MemoryVectorBackend, RagIndex, SearchRequest};

fn create_request() -> CreateAgentRequest {
    CreateAgentRequest {
        organization_id: "org_1".into(),
        name: "Front Desk".into(),
        role: Some("reception".into()),
        ai_persona_name: Some("Asha".into()),
        system_prompt: "Answer questions about the store.".into(),
        language: "en-US".into(),
        greeting: "Hello!".into(),
        farewell: "Goodbye!".into(),
        config: json!({}),
        phone_country_code: Some("+1".into()),
        phone_number: Some("+15550100".into()),
        phone_location: None,
        business_type: Some("retail store".into()),
    }
}

fn session(id: &str, agent_id: &str) -> CallSession {
    CallSession {
        session_id: id.into(),
        organization_id: "org_1".into(),
        agent_id: Some(agent_id.into()),
        call_type: CallType::Inbound,
        phone_number: Some("+15550199".into()),
        started_at: now_ms(),
        ended_at: None,
        duration_seconds: None,
        status: SessionStatus::Completed,
    }
}

fn interaction(session_id: &str, agent_id: &str, index: i64) -> CallInteraction {
    CallInteraction {
        interaction_id: format!("{}-{}", session_id, index),
        session_id: session_id.into(),
        organization_id: "org_1".into(),
        agent_id: Some(agent_id.into()),
        interaction_type: if index % 2 == 0 {
            InteractionType::UserMessage
        } else {
            InteractionType::AgentResponse
        },
        timestamp: now_ms() + index,
        user_input: None,
        agent_response: None,
        function_name: None,
        function_params: None,
        function_result: None,
        latency_ms: None,
        sentiment: None,
    }
}

fn chunk(agent_id: &str, doc_id: &str, index: usize) -> ChunkRecord {
    ChunkRecord {
        chunk_id: format!("{}_{}_{}", agent_id, doc_id, index),
        document_id: doc_id.into(),
        agent_id: agent_id.into(),
        rag_namespace: agent_id.into(),
        rag_entry_id: format!("entry_{}_{}", doc_id, index),
        chunk_index: index,
        total_chunks: 3,
        text: "preview".into(),
        content_hash: format!("hash{}", index),
        created_at: now_ms(),
    }
}

#[tokio::test]
async fn cascade_delete_removes_everything_and_counts() {
    let stores = PersistenceLayer::in_memory();
    let index = Arc::new(RagIndex::new(
        Arc::new(MemoryVectorBackend::new()),
        Arc::new(HashEmbedder::new(64)),
    ));
    let lifecycle = AgentLifecycle::new(stores.clone(), index.clone());

    let agent = lifecycle.create(create_request()).await.unwrap();
    let agent_id = agent.id.clone();

    // 2 documents with 3 chunks each.
    for doc in ["doc_a", "doc_b"] {
        stores
            .documents
            .insert_document(&Document {
                document_id: doc.into(),
                agent_id: agent_id.clone(),
                source_type: "upload".into(),
                filename: format!("{}.md", doc),
                file_size: 100,
                created_at: now_ms(),
            })
            .await
            .unwrap();
        let records: Vec<ChunkRecord> = (0..3).map(|i| chunk(&agent_id, doc, i)).collect();
        stores.documents.insert_chunks(&records).await.unwrap();
    }

    // 3 call sessions with 10 interactions total.
    for s in ["s1", "s2", "s3"] {
        stores.sessions.create(&session(s, &agent_id)).await.unwrap();
    }
    let mut interactions = Vec::new();
    for i in 0..10 {
        let s = ["s1", "s2", "s3"][(i % 3) as usize];
        interactions.push(interaction(s, &agent_id, i));
    }
    for item in &interactions {
        stores.interactions.log_batch(std::slice::from_ref(item)).await.unwrap();
    }

    // 1 installed integration.
    stores
        .integrations
        .install(&Integration {
            integration_id: "i1".into(),
            agent_id: agent_id.clone(),
            tool_id: "slack".into(),
            name: "Notify".into(),
            config: json!({ "webhookUrl": "https://hooks.slack.com/services/T/B/x" }),
            enabled_triggers: vec![TriggerType::CallEnded],
            status: IntegrationStatus::Active,
            created_at: now_ms(),
        })
        .await
        .unwrap();

    // Knowledge entries in the agent's namespace.
    for i in 0..4 {
        index
            .add(AddRequest {
                namespace: agent_id.clone(),
                key: Some(format!("{}_doc_a_hash{}", agent_id, i)),
                text: format!("knowledge entry number {}", i),
                title: None,
                chunk_index: Some(i),
            })
            .await
            .unwrap();
    }

    let report = lifecycle.delete_agent(&agent_id).await.unwrap();

    // 2 documents + 6 chunks + 3 sessions + 10 interactions + 1 integration.
    assert_eq!(report.total_records_deleted, 22);
    assert!(report.namespace_cleanup_scheduled);

    let counts: std::collections::HashMap<&str, u64> = report.tables.iter().copied().collect();
    assert_eq!(counts["callSessions"], 3);
    assert_eq!(counts["callInteractions"], 10);
    assert_eq!(counts["documents"], 2);
    assert_eq!(counts["chunks"], 6);
    assert_eq!(counts["agentIntegrations"], 1);
    assert_eq!(counts["callMetrics"], 0);
    assert_eq!(counts["integrationLogs"], 0);

    // Every per-agent listing is now empty.
    assert!(stores.agents.get(&agent_id).await.unwrap().is_none());
    assert!(stores.sessions.list_by_agent(&agent_id).await.unwrap().is_empty());
    assert!(stores
        .documents
        .list_documents_by_agent(&agent_id)
        .await
        .unwrap()
        .is_empty());
    assert!(stores
        .integrations
        .list_by_agent(&agent_id)
        .await
        .unwrap()
        .is_empty());
    assert!(stores
        .interactions
        .get_by_session(&"s1".to_string())
        .await
        .unwrap()
        .is_empty());

    // The scheduled namespace cleanup eventually empties the vector store.
    let mut cleared = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let response = index
            .search(SearchRequest {
                namespace: agent_id.clone(),
                query: "knowledge entry".into(),
                limit: 10,
                score_threshold: 0.0,
                chunk_context: None,
            })
            .await
            .unwrap();
        if response.is_empty() {
            cleared = true;
            break;
        }
    }
    assert!(cleared, "namespace cleanup never ran");
}

#[tokio::test]
async fn delete_is_idempotent_per_table() {
    let stores = PersistenceLayer::in_memory();
    let index = Arc::new(RagIndex::new(
        Arc::new(MemoryVectorBackend::new()),
        Arc::new(HashEmbedder::new(64)),
    ));
    let lifecycle = AgentLifecycle::new(stores.clone(), index);

    let agent = lifecycle.create(create_request()).await.unwrap();
    let report = lifecycle.delete_agent(&agent.id).await.unwrap();
    assert_eq!(report.total_records_deleted, 0);

    // A second delete finds no agent record.
    assert!(lifecycle.delete_agent(&agent.id).await.is_err());
}
