// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Registry Module
 * Tool catalog and descriptor management
 * © 2026 Bountyy Oy
 */

pub mod tool_registry;

pub use tool_registry::{
    descriptor_for, ParamType, ParameterSpec, RegisteredTool, ToolCatalog, ToolDescriptor,
};
