// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 lambda-pipeline contributors

//! Roles and the capabilities they grant
//!
//! Permissions are modeled as an explicit, enumerated capability set per
//! role. Managed policy bundles are expanded into the capabilities they
//! imply so that a role's effective reach can be compared with what its
//! build project actually needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Service principal trusted by build projects
pub const CODEBUILD_SERVICE: &str = "codebuild.amazonaws.com";

/// Service principal trusted by the pipeline itself
pub const CODEPIPELINE_SERVICE: &str = "codepipeline.amazonaws.com";

/// Service principal trusted by event rules
pub const EVENTS_SERVICE: &str = "events.amazonaws.com";

/// Principal allowed to assume a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Principal {
    Service(String),
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }
}

/// Area of the platform a capability acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityDomain {
    /// Container registry
    Registry,
    /// Serverless functions
    Function,
    /// Pipeline plumbing: artifacts, source, builds, executions
    Pipeline,
    /// Execution support: logging, role passing
    Runtime,
}

impl std::fmt::Display for CapabilityDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registry => write!(f, "registry"),
            Self::Function => write!(f, "function"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// One enumerated permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    RegistryAuthenticate,
    RegistryPull,
    RegistryPush,
    RegistryDescribe,
    FunctionUpdateCode,
    FunctionRead,
    FunctionConfigure,
    FunctionLifecycle,
    FunctionInvoke,
    ArtifactStoreReadWrite,
    SourceRead,
    ProjectStart,
    PipelineStart,
    LogsWrite,
    LogsRead,
    PassRole,
}

impl Capability {
    pub fn domain(&self) -> CapabilityDomain {
        match self {
            Self::RegistryAuthenticate
            | Self::RegistryPull
            | Self::RegistryPush
            | Self::RegistryDescribe => CapabilityDomain::Registry,
            Self::FunctionUpdateCode
            | Self::FunctionRead
            | Self::FunctionConfigure
            | Self::FunctionLifecycle
            | Self::FunctionInvoke => CapabilityDomain::Function,
            Self::ArtifactStoreReadWrite
            | Self::SourceRead
            | Self::ProjectStart
            | Self::PipelineStart => CapabilityDomain::Pipeline,
            Self::LogsWrite | Self::LogsRead | Self::PassRole => CapabilityDomain::Runtime,
        }
    }

    /// IAM actions this capability expands to
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::RegistryAuthenticate => &["ecr:GetAuthorizationToken"],
            Self::RegistryPull => &[
                "ecr:BatchCheckLayerAvailability",
                "ecr:BatchGetImage",
                "ecr:GetDownloadUrlForLayer",
            ],
            Self::RegistryPush => &[
                "ecr:CompleteLayerUpload",
                "ecr:InitiateLayerUpload",
                "ecr:PutImage",
                "ecr:UploadLayerPart",
            ],
            Self::RegistryDescribe => &[
                "ecr:DescribeImageScanFindings",
                "ecr:DescribeImages",
                "ecr:DescribeRepositories",
                "ecr:GetLifecyclePolicy",
                "ecr:GetLifecyclePolicyPreview",
                "ecr:GetRepositoryPolicy",
                "ecr:ListImages",
                "ecr:ListTagsForResource",
            ],
            Self::FunctionUpdateCode => &["lambda:UpdateFunctionCode"],
            Self::FunctionRead => &[
                "lambda:GetFunction",
                "lambda:GetFunctionConfiguration",
                "lambda:ListFunctions",
            ],
            Self::FunctionConfigure => &[
                "lambda:PutFunctionConcurrency",
                "lambda:UpdateFunctionConfiguration",
            ],
            Self::FunctionLifecycle => &[
                "lambda:CreateAlias",
                "lambda:CreateFunction",
                "lambda:DeleteFunction",
                "lambda:PublishVersion",
                "lambda:UpdateAlias",
            ],
            Self::FunctionInvoke => &["lambda:InvokeFunction"],
            Self::ArtifactStoreReadWrite => &[
                "s3:Abort*",
                "s3:DeleteObject*",
                "s3:GetBucket*",
                "s3:GetObject*",
                "s3:List*",
                "s3:PutObject",
            ],
            Self::SourceRead => &[
                "codecommit:CancelUploadArchive",
                "codecommit:GetBranch",
                "codecommit:GetCommit",
                "codecommit:GetUploadArchiveStatus",
                "codecommit:UploadArchive",
            ],
            Self::ProjectStart => &[
                "codebuild:BatchGetBuilds",
                "codebuild:StartBuild",
                "codebuild:StopBuild",
            ],
            Self::PipelineStart => &["codepipeline:StartPipelineExecution"],
            Self::LogsWrite => &[
                "logs:CreateLogGroup",
                "logs:CreateLogStream",
                "logs:PutLogEvents",
            ],
            Self::LogsRead => &[
                "logs:DescribeLogGroups",
                "logs:DescribeLogStreams",
                "logs:FilterLogEvents",
                "logs:GetLogEvents",
            ],
            Self::PassRole => &["iam:PassRole"],
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RegistryAuthenticate => "registry-authenticate",
            Self::RegistryPull => "registry-pull",
            Self::RegistryPush => "registry-push",
            Self::RegistryDescribe => "registry-describe",
            Self::FunctionUpdateCode => "function-update-code",
            Self::FunctionRead => "function-read",
            Self::FunctionConfigure => "function-configure",
            Self::FunctionLifecycle => "function-lifecycle",
            Self::FunctionInvoke => "function-invoke",
            Self::ArtifactStoreReadWrite => "artifact-store-read-write",
            Self::SourceRead => "source-read",
            Self::ProjectStart => "project-start",
            Self::PipelineStart => "pipeline-start",
            Self::LogsWrite => "logs-write",
            Self::LogsRead => "logs-read",
            Self::PassRole => "pass-role",
        };
        f.write_str(name)
    }
}

/// Provider-managed policy bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManagedPolicy {
    #[serde(rename = "AmazonEC2ContainerRegistryPowerUser")]
    ContainerRegistryPowerUser,
    #[serde(rename = "AWSLambda_FullAccess")]
    LambdaFullAccess,
}

impl ManagedPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContainerRegistryPowerUser => "AmazonEC2ContainerRegistryPowerUser",
            Self::LambdaFullAccess => "AWSLambda_FullAccess",
        }
    }

    /// Capabilities the bundle implies
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        match self {
            Self::ContainerRegistryPowerUser => BTreeSet::from([
                Capability::RegistryAuthenticate,
                Capability::RegistryPull,
                Capability::RegistryPush,
                Capability::RegistryDescribe,
            ]),
            Self::LambdaFullAccess => BTreeSet::from([
                Capability::FunctionUpdateCode,
                Capability::FunctionRead,
                Capability::FunctionConfigure,
                Capability::FunctionLifecycle,
                Capability::FunctionInvoke,
                Capability::LogsRead,
                Capability::PassRole,
            ]),
        }
    }
}

impl std::fmt::Display for ManagedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How build roles obtain their permissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    /// Attach the provider-managed bundles
    #[default]
    Managed,
    /// Explicit grants scoped to the resources each project touches
    LeastPrivilege,
}

/// Resource a grant applies to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum ResourceScope {
    /// Every resource
    Any,
    /// A container registry repository, by name
    Repository(String),
    /// A serverless function, by name
    Function(String),
    /// A source repository, by name
    SourceRepository(String),
    /// A bucket declared in this graph, by logical id
    Bucket(String),
    /// A build project declared in this graph, by logical id
    Project(String),
    /// The pipeline declared in this graph, by name
    Pipeline(String),
    /// Log groups of build projects
    BuildLogs,
}

/// Explicit capabilities on one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub capabilities: BTreeSet<Capability>,
    pub resource: ResourceScope,
}

impl Grant {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>, resource: ResourceScope) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
            resource,
        }
    }
}

/// Permission grant bound to a trusted principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Logical id of the role resource
    pub logical_id: String,

    /// Who may assume the role
    pub principal: Principal,

    /// Attached provider-managed bundles
    #[serde(default)]
    pub managed_policies: Vec<ManagedPolicy>,

    /// Explicit grants
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl Role {
    pub fn new(logical_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            logical_id: logical_id.into(),
            principal,
            managed_policies: Vec::new(),
            grants: Vec::new(),
        }
    }

    pub fn with_managed_policy(mut self, policy: ManagedPolicy) -> Self {
        self.managed_policies.push(policy);
        self
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Effective capability set
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        self.managed_policies
            .iter()
            .flat_map(|p| p.capabilities())
            .chain(self.grants.iter().flat_map(|g| g.capabilities.iter().copied()))
            .collect()
    }

    pub fn grants_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Domains reached by at least one capability
    pub fn domains(&self) -> BTreeSet<CapabilityDomain> {
        self.capabilities().iter().map(Capability::domain).collect()
    }

    pub fn grants_domain(&self, domain: CapabilityDomain) -> bool {
        self.capabilities().iter().any(|c| c.domain() == domain)
    }

    /// Capabilities granted beyond `required`
    pub fn excess_over(&self, required: &BTreeSet<Capability>) -> BTreeSet<Capability> {
        self.capabilities().difference(required).copied().collect()
    }

    /// Capabilities in `required` the role does not grant
    pub fn missing_from(&self, required: &BTreeSet<Capability>) -> BTreeSet<Capability> {
        required.difference(&self.capabilities()).copied().collect()
    }
}
