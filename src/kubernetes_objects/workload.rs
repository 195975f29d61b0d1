use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, PodSpec, PodTemplateSpec, SeccompProfile, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{MANAGER_NAME, ResourceRef};
use crate::config::Config;

pub(crate) const PRODUCER_JOB_NAME: &str = "kafka-producer";
pub(crate) const CONSUMER_JOB_NAME: &str = "kafka-consumer";

const CONTAINER_NAME: &str = "kafka";
const WORKING_DIR: &str = "/opt/kafka";
const ROLE_LABEL: &str = "kafka-smoke/role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    pub(crate) fn job_name(self) -> &'static str {
        match self {
            Role::Producer => PRODUCER_JOB_NAME,
            Role::Consumer => CONSUMER_JOB_NAME,
        }
    }

    /// Shell script run by the job's container.
    ///
    /// The consumer exits non-zero unless the single message it reads is
    /// exactly the literal the producer wrote.
    fn script(self, config: &Config) -> String {
        let bootstrap = config.bootstrap_server();
        let topic = &config.topic;
        let message = &config.message;
        match self {
            // The message is never parsed as an option, even with a leading '-'.
            Role::Producer => format!(
                "printf '%s\\n' '{message}' | bin/kafka-console-producer.sh \
                 --bootstrap-server {bootstrap} --topic {topic}"
            ),
            Role::Consumer => format!(
                "bin/kafka-console-consumer.sh --bootstrap-server {bootstrap} --topic {topic} \
                 --from-beginning --max-messages 1 | grep -Fx -e '{message}'"
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

/// Container security settings applied to every workload. Not configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityProfile {
    privileged: bool,
    allow_privilege_escalation: bool,
    run_as_non_root: bool,
    dropped_capabilities: Vec<String>,
    seccomp_profile_type: String,
}

impl SecurityProfile {
    pub(crate) fn restricted() -> Self {
        Self {
            privileged: false,
            allow_privilege_escalation: false,
            run_as_non_root: true,
            dropped_capabilities: vec!["ALL".to_string()],
            seccomp_profile_type: "RuntimeDefault".to_string(),
        }
    }

    fn security_context(&self) -> SecurityContext {
        SecurityContext {
            privileged: Some(self.privileged),
            allow_privilege_escalation: Some(self.allow_privilege_escalation),
            run_as_non_root: Some(self.run_as_non_root),
            capabilities: Some(Capabilities {
                drop: Some(self.dropped_capabilities.clone()),
                ..Default::default()
            }),
            seccomp_profile: Some(SeccompProfile {
                type_: self.seccomp_profile_type.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Everything needed to submit one producer or consumer job.
#[derive(Debug, Clone)]
pub(crate) struct WorkloadSpec {
    pub(crate) role: Role,
    pub(crate) resource: ResourceRef,
    pub(crate) image: String,
    pub(crate) working_dir: &'static str,
    pub(crate) command: Vec<String>,
    security: SecurityProfile,
}

impl WorkloadSpec {
    pub(crate) fn new(role: Role, image: &str, config: &Config) -> Self {
        Self {
            role,
            resource: ResourceRef::job(&config.namespace, role.job_name()),
            image: image.to_string(),
            working_dir: WORKING_DIR,
            command: vec!["bash".to_string(), "-c".to_string(), role.script(config)],
            security: SecurityProfile::restricted(),
        }
    }

    pub(crate) fn security(&self) -> &SecurityProfile {
        &self.security
    }

    pub(crate) fn manifest(&self) -> Job {
        let (command, args) = self.command.split_at(1);
        let labels = BTreeMap::from([
            (
                "app.kubernetes.io/managed-by".to_string(),
                MANAGER_NAME.to_string(),
            ),
            (ROLE_LABEL.to_string(), self.role.to_string()),
        ]);

        Job {
            metadata: ObjectMeta {
                name: Some(self.resource.name.clone()),
                namespace: Some(self.resource.namespace.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(JobSpec {
                // A failed pod is not replaced; the poller decides the outcome.
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        restart_policy: Some("Never".to_string()),
                        containers: vec![Container {
                            name: CONTAINER_NAME.to_string(),
                            image: Some(self.image.clone()),
                            working_dir: Some(self.working_dir.to_string()),
                            command: Some(command.to_vec()),
                            args: Some(args.to_vec()),
                            security_context: Some(self.security.security_context()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn container(job: &Job) -> &Container {
        &job.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn test_security_profile_is_restricted_for_every_role() {
        let config = test_config();
        for role in [Role::Producer, Role::Consumer] {
            let job = WorkloadSpec::new(role, "kafka:latest", &config).manifest();
            let ctx = container(&job).security_context.as_ref().unwrap();

            assert_eq!(ctx.privileged, Some(false));
            assert_eq!(ctx.allow_privilege_escalation, Some(false));
            assert_eq!(ctx.run_as_non_root, Some(true));
            assert_eq!(
                ctx.capabilities.as_ref().unwrap().drop,
                Some(vec!["ALL".to_string()])
            );
            assert_eq!(ctx.seccomp_profile.as_ref().unwrap().type_, "RuntimeDefault");
        }
    }

    #[test]
    fn test_producer_manifest() {
        let config = test_config();
        let job = WorkloadSpec::new(Role::Producer, "kafka:latest", &config).manifest();
        let pod_spec = job.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let c = container(&job);

        assert_eq!(job.metadata.name.as_deref(), Some("kafka-producer"));
        assert_eq!(job.metadata.namespace.as_deref(), Some("ns1"));
        assert_eq!(pod_spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(c.name, "kafka");
        assert_eq!(c.image.as_deref(), Some("kafka:latest"));
        assert_eq!(c.working_dir.as_deref(), Some("/opt/kafka"));
        assert_eq!(c.command, Some(vec!["bash".to_string()]));
        assert_eq!(
            c.args,
            Some(vec![
                "-c".to_string(),
                "printf '%s\\n' 'foo' | bin/kafka-console-producer.sh \
                 --bootstrap-server my-cluster-kafka-bootstrap:9092 --topic test-topic"
                    .to_string(),
            ])
        );
    }

    #[test]
    fn test_consumer_reads_one_message_and_matches_literal() {
        let config = test_config();
        let spec = WorkloadSpec::new(Role::Consumer, "kafka:latest", &config);

        assert_eq!(spec.resource, ResourceRef::job("ns1", "kafka-consumer"));
        assert_eq!(
            spec.command[2],
            "bin/kafka-console-consumer.sh --bootstrap-server my-cluster-kafka-bootstrap:9092 \
             --topic test-topic --from-beginning --max-messages 1 | grep -Fx -e 'foo'"
        );
        assert_eq!(spec.security(), &SecurityProfile::restricted());
    }

    #[test]
    fn test_leading_dash_message_is_an_operand() {
        let mut config = test_config();
        config.message = "-n".to_string();

        let producer = WorkloadSpec::new(Role::Producer, "kafka:latest", &config);
        let consumer = WorkloadSpec::new(Role::Consumer, "kafka:latest", &config);

        assert!(producer.command[2].starts_with("printf '%s\\n' '-n' | "));
        assert!(consumer.command[2].ends_with("| grep -Fx -e '-n'"));
    }
}
