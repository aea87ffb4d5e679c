/// Dense enumeration of the knowledge base's subject matter. The guardrail
/// compares each refined query against the embedding of this paragraph, so
/// it should list products and topics rather than read as prose.
pub const DOMAIN_DESCRIPTION: &str = "Healthcare revenue cycle management for radiology \
practices, imaging centers and hospital-based radiology groups. Medical billing and coding \
for diagnostic imaging: CPT and ICD-10 coding, modifiers, professional and technical \
component billing, global billing. Claim denials, denial rate reduction, denial management \
and appeals, prior authorization and pre-certification for MRI, CT, PET and ultrasound, \
eligibility verification, charge capture, coding accuracy and compliance audits. Accounts \
receivable follow-up, days in A/R, clean claim rate, net collection rate, payer underpayments \
and contract management, patient statements and patient collections, credentialing and \
enrollment. Practice analytics and reporting dashboards, KPI benchmarking, revenue leakage, \
workflow automation, RIS and PACS integration, outsourcing versus in-house billing, \
regulatory changes from CMS and commercial payers, MIPS and quality reporting. Case studies \
of radiology groups improving collections and white papers on reimbursement strategy.";

/// Default `config.yml` written next to the binary when none exists.
pub const SAMPLE_CONFIG: &str = r#"server:
  host: 127.0.0.1
  port: 8000
providers:
  request_timeout_secs: 60
  llm:
    base_url: https://api.openai.com/v1
    chat_model: gpt-4o-mini
    classification_model: gpt-4o-mini
  embedding:
    base_url: https://api.openai.com/v1
    model: text-embedding-3-large
    dimensions: 1024
  rerank:
    base_url: https://api.cohere.com/v2
    model: rerank-v3.5
  vector:
    base_url: http://localhost:6333
    collection: knowledge_base
guardrail:
  confidence_threshold: 4
  similarity_threshold: 0.4
retrieval:
  total_candidates: 14
  case_study_limit: 4
  white_paper_limit: 10
  case_study_rerank_top: 1
  white_paper_rerank_top: 5
generation:
  max_steps: 3
rate_limit:
  requests: 20
  window_ms: 60000
  sweep_interval_ms: 60000
"#;
